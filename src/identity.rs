//! Session and device identity resolution.

use std::fs;
use std::io;
use std::path::PathBuf;

use uuid::Uuid;

use crate::types::{DeviceId, SessionId};

/// Identity tags applied to every recorded operation.
///
/// The session id is generated once per context and never changes for its
/// lifetime. The device id is read from durable local storage, generated and
/// written on first use, so it stays stable across sessions on one device.
#[derive(Debug, Clone)]
pub struct IdentityContext {
    session_id: SessionId,
    device_id: DeviceId,
}

impl IdentityContext {
    /// Creates an ephemeral identity with no durable device id storage.
    pub fn ephemeral() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
        }
    }

    /// Creates an identity whose device id persists at `path`.
    ///
    /// An unreadable or malformed file is replaced with a fresh id rather
    /// than reported; only write failures surface.
    pub fn with_device_file(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let existing = fs::read_to_string(&path)
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok());

        let device_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, id.to_string())?;
                id
            }
        };

        Ok(Self {
            session_id: Uuid::new_v4(),
            device_id,
        })
    }

    /// Session id, stable for the lifetime of this context.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Device id, stable across sessions on this device.
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }
}
