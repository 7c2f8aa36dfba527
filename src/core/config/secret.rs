use std::io::Write;
use std::{fs, path::Path, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const SECRET_FILE_NAME: &str = ".secret_key";

pub(super) fn load_or_create_secret_key() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(SECRET_FILE_NAME);
    load_or_create_at(&path)
}

/// Returns the key stored at `path`, creating it on first use. A failure to
/// persist still yields a usable in-memory key; tokens just won't survive a restart.
fn load_or_create_at(path: &Path) -> String {
    if let Some(existing) = read_key(path) {
        return existing;
    }

    let new_key = generate_secret_key();

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(error = %err, path = %parent.display(), "Failed to create secret key directory");
        }
    }

    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;

                if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
                    tracing::warn!(error = %err, path = %path.display(), "Failed to restrict secret key file");
                }
            }

            if let Err(err) = file.write_all(new_key.as_bytes()) {
                tracing::warn!(error = %err, path = %path.display(), "Failed to write secret key file");
            }
            new_key
        }
        // Another process won the race; use its key.
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            read_key(path).unwrap_or(new_key)
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to create secret key file");
            new_key
        }
    }
}

fn read_key(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn key_is_created_once_and_reused() {
        let dir = std::env::temp_dir().join(format!("reforge-secret-{}", Uuid::new_v4()));
        let path = dir.join(SECRET_FILE_NAME);

        let first = load_or_create_at(&path);
        let second = load_or_create_at(&path);

        assert_eq!(first, second);
        assert!(first.len() >= 80);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn blank_file_is_replaced_in_memory() {
        let dir = std::env::temp_dir().join(format!("reforge-secret-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join(SECRET_FILE_NAME);
        fs::write(&path, "   \n").expect("write blank");

        assert!(read_key(&path).is_none());
        assert!(!load_or_create_at(&path).is_empty());

        let _ = fs::remove_dir_all(dir);
    }
}
