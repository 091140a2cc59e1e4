use {
    anyhow::{Context, Result, bail},
    secrecy::SecretString,
    std::{fs, path::PathBuf},
};

/// Expand a leading `~` to the home directory. Other paths pass through untouched.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// The key is an opaque secret. Surrounding whitespace (e.g. the trailing newline editors add) is dropped.
pub fn api_key_from_str(raw: &str) -> Result<SecretString> {
    let key = raw.trim();
    if key.is_empty() {
        bail!("API key is empty");
    }
    Ok(SecretString::from(key.to_string()))
}

pub fn load_api_key(path: &str) -> Result<SecretString> {
    let path = expand_home(path);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read API key from {}", path.display()))?;
    api_key_from_str(&raw).with_context(|| format!("No API key in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::tempdir;

    #[test]
    fn test_key_is_trimmed() {
        let key = api_key_from_str("  CG-abc123\n").unwrap();
        assert_eq!(key.expose_secret(), "CG-abc123");
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(api_key_from_str(" \n\t").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coingecko.key");
        fs::write(&path, "CG-from-file\n").unwrap();

        let key = load_api_key(path.to_str().unwrap()).unwrap();
        assert_eq!(key.expose_secret(), "CG-from-file");
    }

    #[test]
    fn test_missing_file_mentions_path() {
        let err = load_api_key("/definitely/not/here.key").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.key"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/key"), PathBuf::from("/etc/key"));
        assert_eq!(expand_home("relative.key"), PathBuf::from("relative.key"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/keys/cg.key"), home.join("keys/cg.key"));
        }
    }
}
