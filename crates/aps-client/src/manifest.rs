use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_NOT_AVAILABLE: &str = "n/a";

/// Translation manifest as reported by the model derivative service.
///
/// Only the fields the gateway reports on are modelled; message records are
/// kept as raw JSON since their shape belongs to APS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub status: String,
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub derivatives: Option<Vec<Derivative>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Derivative {
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
    #[serde(default)]
    pub children: Option<Vec<Derivative>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
}

impl StatusSummary {
    pub fn not_available() -> Self {
        Self {
            status: STATUS_NOT_AVAILABLE.to_string(),
            progress: None,
            messages: None,
        }
    }
}

impl Manifest {
    /// Every message in the derivative tree, parents before their children.
    pub fn messages(&self) -> Vec<Value> {
        let mut out = Vec::new();
        if let Some(derivatives) = &self.derivatives {
            collect_messages(derivatives, &mut out);
        }
        out
    }
}

fn collect_messages(nodes: &[Derivative], out: &mut Vec<Value>) {
    for node in nodes {
        if let Some(messages) = &node.messages {
            out.extend(messages.iter().cloned());
        }
        if let Some(children) = &node.children {
            collect_messages(children, out);
        }
    }
}

/// Reduces a manifest to the summary returned by the status endpoint. A
/// missing manifest means translation was never submitted or is not visible
/// upstream yet.
pub fn flatten(manifest: Option<&Manifest>) -> StatusSummary {
    match manifest {
        None => StatusSummary::not_available(),
        Some(manifest) => StatusSummary {
            status: manifest.status.clone(),
            progress: manifest.progress.clone(),
            messages: Some(manifest.messages()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(messages: Vec<Value>, children: Vec<Derivative>) -> Derivative {
        Derivative {
            messages: Some(messages),
            children: Some(children),
        }
    }

    #[test]
    fn missing_manifest_reports_not_available_only() {
        let summary = flatten(None);
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({ "status": "n/a" })
        );
    }

    #[test]
    fn empty_derivatives_yield_no_messages() {
        let manifest = Manifest {
            status: "pending".into(),
            progress: Some(json!("0% complete")),
            derivatives: Some(vec![]),
        };
        let summary = flatten(Some(&manifest));
        assert_eq!(summary.status, "pending");
        assert_eq!(summary.progress, Some(json!("0% complete")));
        assert_eq!(summary.messages, Some(vec![]));
    }

    #[test]
    fn child_messages_follow_their_parent() {
        let m1 = json!({ "type": "warning", "code": "W1", "message": "first" });
        let m2 = json!({ "type": "error", "code": "E2", "message": "second" });
        let manifest = Manifest {
            status: "failed".into(),
            progress: Some(json!("complete")),
            derivatives: Some(vec![node(vec![m1.clone()], vec![node(vec![m2.clone()], vec![])])]),
        };
        assert_eq!(flatten(Some(&manifest)).messages, Some(vec![m1, m2]));
    }

    #[test]
    fn grandchildren_are_included_in_preorder() {
        let manifest = Manifest {
            status: "success".into(),
            progress: Some(json!("complete")),
            derivatives: Some(vec![
                node(
                    vec![json!("a")],
                    vec![
                        node(vec![json!("a.1")], vec![node(vec![json!("a.1.1")], vec![])]),
                        node(vec![json!("a.2")], vec![]),
                    ],
                ),
                node(vec![json!("b")], vec![]),
            ]),
        };
        assert_eq!(
            manifest.messages(),
            vec![
                json!("a"),
                json!("a.1"),
                json!("a.1.1"),
                json!("a.2"),
                json!("b")
            ]
        );
    }

    #[test]
    fn absent_optional_fields_are_empty() {
        let manifest: Manifest = serde_json::from_value(json!({
            "status": "inprogress",
            "progress": "45% complete",
            "derivatives": [
                { "outputType": "svf2" },
                { "messages": null, "children": [ { "messages": [ { "code": "c" } ] } ] }
            ]
        }))
        .unwrap();
        assert_eq!(manifest.messages(), vec![json!({ "code": "c" })]);

        let bare: Manifest = serde_json::from_value(json!({ "status": "pending" })).unwrap();
        let summary = flatten(Some(&bare));
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({ "status": "pending", "messages": [] })
        );
    }
}
