//! Hook declarations (spec §4.9 "HookRunner"). The core only discovers,
//! orders, and materializes wrappers; invocation is an external collaborator.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HookModel {
    /// Script name under `/etc/ifstate/hook.d/`, or an absolute path.
    pub script: String,
    pub provides: Vec<String>,
    pub after: Vec<String>,
    pub args: std::collections::BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    Check,
    Start,
}
