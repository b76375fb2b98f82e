use crate::error::Result;
use crate::schema::{FromNode, SchemaTable};
use roxmltree::Node;

/// Identity and versioning stamp carried by most archive entities
///
/// Built from a `dbInfo` node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbStamp {
    pub uid: String,
    pub date: String,
    pub time: String,
}

#[derive(Default)]
struct Timestamp {
    date: String,
    time: String,
}

impl FromNode for Timestamp {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut ts = Timestamp::default();
        let mut table = SchemaTable::new();
        table.bind("date", &mut ts.date);
        table.bind("time", &mut ts.time);
        table.search(node)?;
        table.finish(node)?;
        Ok(ts)
    }
}

impl FromNode for DbStamp {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut uid = String::new();
        let mut ts = Timestamp::default();
        let mut table = SchemaTable::new();
        table.bind("databaseUID", &mut uid);
        table.bind_object("creationTimestamp", &mut ts);
        table.search(node)?;
        table.finish(node)?;
        Ok(DbStamp {
            uid,
            date: ts.date,
            time: ts.time,
        })
    }
}

impl DbStamp {
    /// Series number derived from the stamp
    ///
    /// The year is dropped from the date and the time is appended, giving a
    /// number that is unique enough within one patient archive.
    pub fn series_number(&self) -> String {
        let day = self.date.get(4..).unwrap_or("");
        format!("{}{}", day, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TomoError;
    use roxmltree::Document;

    #[test]
    fn test_parse_db_info() {
        let doc = Document::parse(
            "<dbInfo><databaseUID>1.2.3</databaseUID>\
             <creationTimestamp><date>20200131</date><time>101500</time></creationTimestamp></dbInfo>",
        )
        .unwrap();
        let stamp = DbStamp::from_node(doc.root_element()).unwrap();
        assert_eq!(stamp.uid, "1.2.3");
        assert_eq!(stamp.date, "20200131");
        assert_eq!(stamp.time, "101500");
        assert_eq!(stamp.series_number(), "0131101500");
    }

    #[test]
    fn test_missing_timestamp_field() {
        let doc = Document::parse(
            "<dbInfo><databaseUID>1.2.3</databaseUID>\
             <creationTimestamp><date>20200131</date></creationTimestamp></dbInfo>",
        )
        .unwrap();
        let err = DbStamp::from_node(doc.root_element()).unwrap_err();
        assert!(
            matches!(err, TomoError::MissingFields { ref node, ref fields } if node == "creationTimestamp" && fields == &["time"])
        );
    }

    #[test]
    fn test_series_number_short_date() {
        let stamp = DbStamp {
            uid: String::new(),
            date: "2020".to_string(),
            time: "1200".to_string(),
        };
        assert_eq!(stamp.series_number(), "1200");
    }
}
