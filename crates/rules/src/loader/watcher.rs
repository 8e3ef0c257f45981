//! Filesystem event handler for the notify watcher (hot-reload).

use std::fs;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tracing::{info, warn};

use super::core::{is_yaml, parse_yaml, Shared};

/// Handle a single filesystem event from the notify watcher.
///
/// Reloaded compositions are only checked structurally so an edit that
/// lands before its atoms does not get dropped.
pub(super) fn handle_fs_event(event: &Event, shared: &Shared) {
    for path in &event.paths {
        if !is_yaml(path) {
            continue;
        }

        // Skip dotfiles (including our .tmp files)
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                continue;
            }
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_)) => {
                if !path.exists() {
                    // Rename away from this path.
                    if let Some((kind, id)) = shared.remove_path(path) {
                        info!(id = %id, kind = %kind, path = %path.display(), "dropped document after rename");
                    }
                    continue;
                }

                let contents = match fs::read_to_string(path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to read file during hot-reload");
                        continue;
                    }
                };

                let applied = parse_yaml(&contents).and_then(|doc| {
                    let kind = doc.kind();
                    let id = doc.id().to_string();
                    shared.apply(doc, path, false).map(|()| (kind, id))
                });
                match applied {
                    Ok((kind, id)) => {
                        info!(id = %id, kind = %kind, path = %path.display(), "hot-reloaded document");
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to reload document, keeping previous version"
                        );
                    }
                }
            }
            EventKind::Remove(RemoveKind::File) => {
                if let Some((kind, id)) = shared.remove_path(path) {
                    info!(id = %id, kind = %kind, path = %path.display(), "removed document after file deletion");
                }
            }
            _ => {}
        }
    }
}
