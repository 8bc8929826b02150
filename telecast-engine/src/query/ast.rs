//! The query tree (§4.F): nested `[kind, value]` pairs parsed from request
//! JSON.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::parsing::{parse_day_of_week_set, parse_hour_set};

#[derive(Debug, Clone)]
pub enum QueryNode {
    All,
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Video(BTreeSet<u32>),
    Channel(String),
    Show(String),
    Hour(BTreeSet<u8>),
    DayOfWeek(BTreeSet<u8>),
    /// Dilation window in seconds, applied to sibling `text` atoms once
    /// hoisted into the active context.
    TextWindow(i32),
    Text(String),
    FaceName(String),
    FaceTag(String),
    FaceCount(u8),
}

pub fn parse_query(value: &Value) -> Result<QueryNode> {
    let arr = value
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| Error::InvalidUsage(format!("query node must be [kind, value], got {value}")))?;
    let kind = arr[0]
        .as_str()
        .ok_or_else(|| Error::InvalidUsage("query node kind must be a string".into()))?;
    let body = &arr[1];

    Ok(match kind {
        "all" => QueryNode::All,
        "and" => QueryNode::And(parse_children(body)?),
        "or" => QueryNode::Or(parse_children(body)?),
        "video" => QueryNode::Video(parse_id_set(body)?),
        "channel" => QueryNode::Channel(expect_str(body)?),
        "show" => QueryNode::Show(expect_str(body)?),
        "hour" => QueryNode::Hour(parse_hour_set(&expect_str(body)?)?),
        "day_of_week" => QueryNode::DayOfWeek(parse_day_of_week_set(&expect_str(body)?)?),
        "text_window" => QueryNode::TextWindow(expect_int(body)?),
        "text" => QueryNode::Text(expect_str(body)?),
        "face_name" => QueryNode::FaceName(expect_str(body)?.to_lowercase()),
        "face_tag" => QueryNode::FaceTag(expect_str(body)?),
        "face_count" => {
            let n = expect_int(body)?;
            if !(1..=255).contains(&n) {
                return Err(Error::InvalidUsage(format!("face_count {n} out of range 1..255")));
            }
            QueryNode::FaceCount(n as u8)
        }
        other => return Err(Error::InvalidUsage(format!("unknown query kind {other:?}"))),
    })
}

fn parse_children(body: &Value) -> Result<Vec<QueryNode>> {
    body.as_array()
        .ok_or_else(|| Error::InvalidUsage("and/or value must be a list".into()))?
        .iter()
        .map(parse_query)
        .collect()
}

fn parse_id_set(body: &Value) -> Result<BTreeSet<u32>> {
    if let Some(n) = body.as_u64() {
        return Ok(BTreeSet::from([n as u32]));
    }
    body.as_array()
        .ok_or_else(|| Error::InvalidUsage("video value must be an id or list of ids".into()))?
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|n| n as u32)
                .ok_or_else(|| Error::InvalidUsage("video ids must be integers".into()))
        })
        .collect()
}

fn expect_str(body: &Value) -> Result<String> {
    body.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidUsage(format!("expected string value, got {body}")))
}

fn expect_int(body: &Value) -> Result<i32> {
    body.as_i64()
        .map(|n| n as i32)
        .or_else(|| body.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| Error::InvalidUsage(format!("expected integer value, got {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and() {
        let json: Value = serde_json::from_str(r#"["and", [["channel", "CNN"], ["text", "the"]]]"#).unwrap();
        match parse_query(&json).unwrap() {
            QueryNode::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn rejects_face_count_out_of_range() {
        let json: Value = serde_json::from_str(r#"["face_count", 256]"#).unwrap();
        assert!(parse_query(&json).is_err());
    }

    #[test]
    fn parses_hour_range() {
        let json: Value = serde_json::from_str(r#"["hour", "9-17"]"#).unwrap();
        match parse_query(&json).unwrap() {
            QueryNode::Hour(set) => assert!(set.contains(&9) && set.contains(&17)),
            other => panic!("expected Hour, got {other:?}"),
        }
    }
}
