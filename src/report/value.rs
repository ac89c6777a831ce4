use crate::util::round_to;
use serde::Serialize;
use std::collections::BTreeMap;

/// 报告树节点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ReportValue>),
    Map(BTreeMap<String, ReportValue>),
}

pub type ReportMap = BTreeMap<String, ReportValue>;

impl ReportValue {
    pub fn empty_map() -> Self {
        ReportValue::Map(BTreeMap::new())
    }

    pub fn as_map(&self) -> Option<&ReportMap> {
        match self {
            ReportValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ReportValue]> {
        match self {
            ReportValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Follow a dotted path of map keys, e.g. `"ma_data.general"`.
    pub fn get_path(&self, path: &str) -> Option<&ReportValue> {
        path.split('.')
            .try_fold(self, |node, key| node.as_map().and_then(|m| m.get(key)))
    }
}

impl From<f64> for ReportValue {
    fn from(v: f64) -> Self {
        ReportValue::Float(v)
    }
}

impl From<i64> for ReportValue {
    fn from(v: i64) -> Self {
        ReportValue::Int(v)
    }
}

impl From<usize> for ReportValue {
    fn from(v: usize) -> Self {
        ReportValue::Int(v as i64)
    }
}

impl From<bool> for ReportValue {
    fn from(v: bool) -> Self {
        ReportValue::Bool(v)
    }
}

impl From<&str> for ReportValue {
    fn from(v: &str) -> Self {
        ReportValue::Text(v.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(v: String) -> Self {
        ReportValue::Text(v)
    }
}

impl<T: Into<ReportValue>> From<Option<T>> for ReportValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ReportValue::Null, Into::into)
    }
}

impl<T: Into<ReportValue>> From<Vec<T>> for ReportValue {
    fn from(v: Vec<T>) -> Self {
        ReportValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<ReportMap> for ReportValue {
    fn from(v: ReportMap) -> Self {
        ReportValue::Map(v)
    }
}

/// Merge `source` into `target`. Colliding maps merge recursively; any other
/// collision is won by `source`.
pub fn deep_merge(target: &mut ReportMap, source: ReportMap) {
    for (key, value) in source {
        match value {
            ReportValue::Map(incoming) => {
                if let Some(ReportValue::Map(existing)) = target.get_mut(&key) {
                    deep_merge(existing, incoming);
                    continue;
                }
                target.insert(key, ReportValue::Map(incoming));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// NaN/inf become `Null`; finite floats are rounded to `decimals`.
pub fn clean(value: ReportValue, decimals: u32) -> ReportValue {
    match value {
        ReportValue::Float(v) if !v.is_finite() => ReportValue::Null,
        ReportValue::Float(v) => ReportValue::Float(round_to(v, decimals)),
        ReportValue::List(items) => ReportValue::List(items.into_iter().map(|v| clean(v, decimals)).collect()),
        ReportValue::Map(map) => ReportValue::Map(map.into_iter().map(|(k, v)| (k, clean(v, decimals))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, ReportValue)>) -> ReportMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn merges_nested_maps() {
        let mut target = map(vec![
            ("usa", map(vec![("T10YIE", 2.3.into())]).into()),
            ("china", "old".into()),
        ]);
        deep_merge(
            &mut target,
            map(vec![
                ("usa", map(vec![("DGS10", 4.1.into())]).into()),
                ("china", map(vec![("南向资金", 12.0.into())]).into()),
            ]),
        );

        let usa = target["usa"].as_map().unwrap();
        assert_eq!(usa.len(), 2);
        assert!(target["china"].as_map().is_some());
    }

    #[test]
    fn later_scalar_wins() {
        let mut target = map(vec![("x", 1.0.into())]);
        deep_merge(&mut target, map(vec![("x", "text".into())]));
        assert_eq!(target["x"], ReportValue::Text("text".into()));
    }

    #[test]
    fn cleans_non_finite_and_rounds() {
        let tree = ReportValue::Map(map(vec![
            ("nan", f64::NAN.into()),
            (
                "list",
                ReportValue::List(vec![f64::INFINITY.into(), 3.14159.into(), ReportValue::Int(7)]),
            ),
            ("text", "keep".into()),
        ]));
        let cleaned = clean(tree, 2);

        assert_eq!(cleaned.get_path("nan"), Some(&ReportValue::Null));
        let list = cleaned.get_path("list").and_then(ReportValue::as_list).unwrap();
        assert_eq!(list[0], ReportValue::Null);
        assert_eq!(list[1], ReportValue::Float(3.14));
        assert_eq!(list[2], ReportValue::Int(7));
        assert_eq!(cleaned.get_path("text"), Some(&ReportValue::Text("keep".into())));
    }

    #[test]
    fn serializes_untagged() {
        let tree = ReportValue::Map(map(vec![("a", ReportValue::Null), ("b", 1.5.into())]));
        assert_eq!(serde_json::to_string(&tree).unwrap(), r#"{"a":null,"b":1.5}"#);
    }
}
