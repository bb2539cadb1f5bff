//! `localStorage` persistence of the current document.

use tracing::warn;
use web_sys::{Storage, window};

fn local_storage() -> Option<Storage> {
    window()?.local_storage().ok().flatten()
}

pub fn save(key: &str, json: &str) {
    let Some(storage) = local_storage() else {
        return;
    };
    if let Err(err) = storage.set_item(key, json) {
        warn!(?err, key, "could not persist state");
    }
}

pub fn load(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok().flatten()
}
