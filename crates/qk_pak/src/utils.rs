/// Normalize an entry name or relative file path into a forward-slash path.
///
/// Both `/` and `\` are treated as separators; empty and `.` components are
/// dropped. Returns `None` if nothing remains, or if the path is absolute,
/// carries a drive prefix, or contains a `..` component.
pub fn normalize_entry_name(name: &str) -> Option<String> {
    if name.starts_with(|c: char| c == '/' || c == '\\') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in name.split(|c: char| c == '/' || c == '\\') {
        match part {
            "" | "." => continue,
            ".." => return None,
            _ if parts.is_empty() && part.ends_with(':') => return None,
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(
            normalize_entry_name("progs/player.mdl").as_deref(),
            Some("progs/player.mdl")
        );
    }

    #[test]
    fn test_normalize_backslashes() {
        assert_eq!(
            normalize_entry_name("textures\\wall.png").as_deref(),
            Some("textures/wall.png")
        );
    }

    #[test]
    fn test_normalize_redundant_components() {
        assert_eq!(
            normalize_entry_name("./sound//misc/./r_tele1.wav").as_deref(),
            Some("sound/misc/r_tele1.wav")
        );
    }

    #[test]
    fn test_normalize_rejects_escapes() {
        assert_eq!(normalize_entry_name("../autoexec.cfg"), None);
        assert_eq!(normalize_entry_name("maps/../../x.bsp"), None);
        assert_eq!(normalize_entry_name("/etc/passwd"), None);
        assert_eq!(normalize_entry_name("\\windows\\x"), None);
        assert_eq!(normalize_entry_name("C:/quake/x"), None);
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(normalize_entry_name(""), None);
        assert_eq!(normalize_entry_name("./"), None);
    }
}
