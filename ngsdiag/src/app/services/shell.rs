// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

/// Very small, safe-ish shell escaper for paths.
pub fn sh_escape(p: &str) -> String {
    let mut out = String::from("'");
    out.push_str(&p.replace('\'', r"'\''"));
    out.push('\'');
    out
}

/// Quotes `word` only when it holds characters the shell would interpret.
pub fn shell_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ','));
    if plain { word.to_string() } else { sh_escape(word) }
}

/// Returns the file name component of a slash-separated remote path.
pub fn remote_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Drops trailing slashes from a directory path; the root stays `/`.
pub fn trim_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Joins a remote directory and a child name without doubling slashes.
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_dir_keeps_the_root() {
        assert_eq!(trim_dir("/data/projects/"), "/data/projects");
        assert_eq!(trim_dir("/"), "/");
        assert_eq!(trim_dir("//"), "/");
        assert_eq!(remote_join(trim_dir("/"), "job.log"), "/job.log");
    }

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(sh_escape("/data/it's here"), r"'/data/it'\''s here'");
        assert_eq!(sh_escape("plain"), "'plain'");
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(shell_word("/db/kraken2"), "/db/kraken2");
        assert_eq!(shell_word("/db/my db"), "'/db/my db'");
        assert_eq!(shell_word(""), "''");
        assert_eq!(shell_word("$(id)"), "'$(id)'");
    }

    #[test]
    fn joins_remote_paths() {
        assert_eq!(remote_join("/data/", "x.log"), "/data/x.log");
        assert_eq!(remote_join("/data", "/x.log"), "/data/x.log");
        assert_eq!(remote_join("", "x.log"), "x.log");
    }

    #[test]
    fn takes_file_name() {
        assert_eq!(remote_file_name("/data/run/ngsdiag_1.sh"), "ngsdiag_1.sh");
        assert_eq!(remote_file_name("bare"), "bare");
    }
}
