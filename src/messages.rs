//! User-facing message catalog

use std::collections::HashMap;

pub const CREATING_RESOURCE: &str = "creating_resource";
pub const RESOURCE_CREATION_ERROR: &str = "resource_creation_error";
pub const RESOURCE_TRANSPORT_ERROR: &str = "resource_transport_error";
pub const DEVICE_ACCESS_ERROR: &str = "device_access_error";
pub const DEVICE_UNSUPPORTED: &str = "device_unsupported";
pub const RECORDER_ERROR: &str = "recorder_error";
pub const NAME_PLACEHOLDER: &str = "name_placeholder";

const DEFAULTS: &[(&str, &str)] = &[
    (CREATING_RESOURCE, "Creating resource..."),
    (
        RESOURCE_CREATION_ERROR,
        "The resource could not be created. You can download your recording instead.",
    ),
    (
        RESOURCE_TRANSPORT_ERROR,
        "The recording could not be sent. Please try again later.",
    ),
    (DEVICE_ACCESS_ERROR, "Access to the camera or microphone failed."),
    (
        DEVICE_UNSUPPORTED,
        "Recording from the camera is not supported here.",
    ),
    (RECORDER_ERROR, "Unable to start the recorder."),
    (NAME_PLACEHOLDER, "provide a name for the resource"),
];

/// Translated messages keyed by id, falling back to English
#[derive(Debug, Clone)]
pub struct Messages {
    entries: HashMap<String, String>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            entries: DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Messages {
    /// Defaults overridden by `overrides`
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut messages = Self::default();
        for (key, value) in overrides {
            messages.entries.insert(key.clone(), value.clone());
        }
        messages
    }

    /// The message for `key`, or the key itself when unknown
    pub fn trans<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }
}
