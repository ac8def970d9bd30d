use rand::Rng;

use super::UploadPolicy;
use crate::errors::UploadError;

const RANDOM_SOURCE: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

pub const STORED_NAME_LEN: usize = 25;

pub fn random_string(n: usize) -> String {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| RANDOM_SOURCE[rng.random_range(0..RANDOM_SOURCE.len())] as char)
        .collect()
}

/// The extension of `name`, including the leading dot.
///
/// Looks only at the last `/`-separated element and returns everything from
/// its final dot, or an empty string when there is none. The result is not
/// validated.
pub fn safe_extension(name: &str) -> &str {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(dot) => &name[base_start + dot..],
        None => "",
    }
}

fn is_plain_extension(ext: &str) -> bool {
    ext.len() > 1 && ext[1..].bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn stored_name(original_name: &str, policy: &UploadPolicy) -> Result<String, UploadError> {
    if !policy.rename_on_store {
        if policy.harden_extensions
            && (original_name.contains(['/', '\\']) || matches!(original_name, "." | ".."))
        {
            return Err(UploadError::MalformedRequest(format!(
                "refusing to store file under {original_name:?}"
            )));
        }
        return Ok(original_name.to_string());
    }

    let ext = safe_extension(original_name);
    let ext = if policy.harden_extensions && !is_plain_extension(ext) {
        ""
    } else {
        ext
    };

    Ok(format!("{}{}", random_string(STORED_NAME_LEN), ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn extension_follows_last_dot_of_last_element() {
        assert_eq!(safe_extension("photo.png"), ".png");
        assert_eq!(safe_extension("archive.tar.GZ"), ".GZ");
        assert_eq!(safe_extension("README"), "");
        assert_eq!(safe_extension(".bashrc"), ".bashrc");
        assert_eq!(safe_extension("trailing."), ".");
        assert_eq!(safe_extension("dir.d/file"), "");
        assert_eq!(safe_extension("dir/file.txt"), ".txt");
    }

    #[test]
    fn random_string_uses_the_alphabet() {
        let s = random_string(200);
        assert_eq!(s.len(), 200);
        assert!(s.bytes().all(|b| RANDOM_SOURCE.contains(&b)));
    }

    #[test]
    fn renamed_files_keep_the_declared_extension() {
        let policy = UploadPolicy::default();
        let name = stored_name("photo.png", &policy).unwrap();

        assert_ne!(name, "photo.png");
        assert_eq!(name.len(), STORED_NAME_LEN + 4);
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn renamed_files_do_not_collide() {
        let policy = UploadPolicy::default();
        let names: HashSet<String> = (0..10_000)
            .map(|_| stored_name("photo.jpg", &policy).unwrap())
            .collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn keeps_original_name_when_rename_disabled() {
        let policy = UploadPolicy {
            rename_on_store: false,
            ..UploadPolicy::default()
        };
        assert_eq!(stored_name("My File.PNG", &policy).unwrap(), "My File.PNG");
        // verbatim, even when unsafe
        assert_eq!(stored_name("../x.png", &policy).unwrap(), "../x.png");
    }

    #[test]
    fn hardened_mode_drops_odd_extensions() {
        let policy = UploadPolicy {
            harden_extensions: true,
            ..UploadPolicy::default()
        };
        assert!(stored_name("a.png", &policy).unwrap().ends_with(".png"));

        let name = stored_name("a.p/../hp", &policy).unwrap();
        assert_eq!(name.len(), STORED_NAME_LEN);
        let name = stored_name("a.ph p", &policy).unwrap();
        assert_eq!(name.len(), STORED_NAME_LEN);
    }

    #[test]
    fn hardened_mode_rejects_paths_without_rename() {
        let policy = UploadPolicy {
            rename_on_store: false,
            harden_extensions: true,
            ..UploadPolicy::default()
        };
        assert!(stored_name("../etc/passwd", &policy).is_err());
        assert!(stored_name("..", &policy).is_err());
        assert_eq!(stored_name("ok.txt", &policy).unwrap(), "ok.txt");
    }
}
