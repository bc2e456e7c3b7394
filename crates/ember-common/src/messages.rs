//! Wire shapes crossing versioned regions and worker ports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of a task component as seen by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Init,
    Run,
    Stop,
    Done,
}

/// Task descriptor exchanged on RUN/STOP transitions.
///
/// `m` is the task's interpreter-side field table snapshot; the supervisor
/// only inspects `m.top.functionname` for admission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskData {
    pub id: i32,
    pub name: String,
    pub state: TaskState,
    #[serde(default)]
    pub m: Value,
}

impl TaskData {
    pub fn function_name(&self) -> Option<&str> {
        self.m.get("top")?.get("functionname")?.as_str()
    }
}

/// Scope of a thread update: the global node, a task node, or the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    Global,
    Task,
    Scene,
}

/// Field mutation kinds carried by a thread update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    #[default]
    Set,
    Observe,
    Unobserve,
}

/// A single field mutation routed between threads. `id == 0` means the main
/// thread (or broadcast, depending on direction); ephemeral, serialized into
/// a versioned region and discarded after delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadUpdate {
    #[serde(default)]
    pub id: i32,
    #[serde(rename = "type")]
    pub scope: UpdateScope,
    pub field: String,
    #[serde(default)]
    pub action: UpdateAction,
    pub value: Value,
}

impl ThreadUpdate {
    pub fn set(id: i32, scope: UpdateScope, field: impl Into<String>, value: Value) -> Self {
        ThreadUpdate {
            id,
            scope,
            field: field.into(),
            action: UpdateAction::Set,
            value,
        }
    }

    /// Re-tags the update for delivery to a specific receiver.
    pub fn for_receiver(&self, id: i32) -> Self {
        let mut update = self.clone();
        update.id = id;
        update
    }
}

/// Device registry image: live entries, keys removed since the last flush,
/// and whether the image still needs persisting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryData {
    pub current: BTreeMap<String, String>,
    pub removed: Vec<String>,
    pub is_dirty: bool,
}

/// Record posted by a worker after loading an interpreter extension.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub library: String,
    pub version: String,
}

/// One decoded remote key event. `remote` is `CLASS:index`, e.g. `ECP:0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub remote: String,
    pub key: i32,
    #[serde(rename = "mod")]
    pub modifier: i32,
}

/// Path of one source or pcode file inside the app package.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PkgFilePath {
    pub id: i32,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Launch payload for the main interpreter thread.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPayload {
    pub device: Value,
    pub manifest: BTreeMap<String, String>,
    #[serde(default)]
    pub deep_link: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: Vec<PkgFilePath>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub pkg_zip: Option<Vec<u8>>,
    #[serde(default)]
    pub ext_zip: Option<Vec<u8>>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
}

/// Second handoff message to a task worker: everything the worker needs to
/// execute one task component, cloned from the app payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub device: Value,
    pub manifest: BTreeMap<String, String>,
    pub task_data: TaskData,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub paths: Vec<PkgFilePath>,
    #[serde(default)]
    pub pkg_zip: Option<Vec<u8>>,
    #[serde(default)]
    pub ext_zip: Option<Vec<u8>>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
}

impl TaskPayload {
    pub fn for_task(app: &AppPayload, task_data: TaskData) -> Self {
        TaskPayload {
            device: app.device.clone(),
            manifest: app.manifest.clone(),
            task_data,
            extensions: app.extensions.clone(),
            paths: app.paths.clone(),
            pkg_zip: app.pkg_zip.clone(),
            ext_zip: app.ext_zip.clone(),
            root: app.root.clone(),
            ext: app.ext.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_update_wire_shape() {
        let update = ThreadUpdate::set(3, UpdateScope::Task, "uri", json!("pkg:/img/a.png"));
        let wire = serde_json::to_value(&update).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": 3,
                "type": "task",
                "field": "uri",
                "action": "set",
                "value": "pkg:/img/a.png",
            })
        );

        let back: ThreadUpdate = serde_json::from_value(wire).unwrap();
        assert_eq!(back.scope, UpdateScope::Task);
        assert_eq!(back.action, UpdateAction::Set);
    }

    #[test]
    fn action_defaults_to_set_when_absent() {
        let back: ThreadUpdate = serde_json::from_value(json!({
            "id": 0,
            "type": "global",
            "field": "ready",
            "value": true,
        }))
        .unwrap();
        assert_eq!(back.action, UpdateAction::Set);
    }

    #[test]
    fn function_name_reads_the_field_table() {
        let task = TaskData {
            id: 1,
            name: "FetchTask".into(),
            state: TaskState::Run,
            m: json!({"top": {"functionname": "fetch", "uri": ""}}),
        };
        assert_eq!(task.function_name(), Some("fetch"));

        let bare = TaskData {
            id: 2,
            name: "Bare".into(),
            state: TaskState::Run,
            m: Value::Null,
        };
        assert_eq!(bare.function_name(), None);
    }

    #[test]
    fn retagged_updates_keep_payload() {
        let update = ThreadUpdate::set(0, UpdateScope::Global, "volume", json!(20));
        let copy = update.for_receiver(4);
        assert_eq!(copy.id, 4);
        assert_eq!(copy.field, update.field);
        assert_eq!(copy.value, update.value);
    }
}
