use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::WatchError;

const META: &[char] = &['*', '?', '[', '{'];

/// A glob split into the directory to watch and a matcher for paths below it.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Directory without glob characters; watched recursively.
    pub base: PathBuf,
    /// Anchored matcher for `/`-separated paths relative to `base`.
    pub regex: Regex,
}

impl Pattern {
    /// Parse `glob`, resolving a relative pattern against `cwd`.
    pub fn new(cwd: &Path, glob: &str) -> Result<Self, WatchError> {
        let (base, rest) = split(glob);
        let source = format!("^{}$", translate(&rest));
        let regex = Regex::new(&source).map_err(|e| WatchError::Pattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base: cwd.join(base),
            regex,
        })
    }

    /// Match `path` (absolute, below `root`) against the pattern.
    ///
    /// `root` is `base` as the watcher reports it, usually canonicalized.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(root) else {
            return false;
        };
        let rel: Vec<_> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect();
        !rel.is_empty() && self.regex.is_match(&rel.join("/"))
    }
}

/// Split a glob into its static directory prefix and the remainder.
fn split(glob: &str) -> (PathBuf, String) {
    let mut base = PathBuf::new();
    let mut parts = glob.split('/').peekable();

    if glob.starts_with('/') {
        base.push("/");
    }
    while let Some(part) = parts.next_if(|p| !p.contains(META)) {
        if !part.is_empty() {
            base.push(part);
        }
    }

    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        // A plain path: watch its directory, match the file name.
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        base.pop();
        return (base, name);
    }
    (base, rest.join("/"))
}

/// Translate glob syntax into (unanchored) regex syntax.
fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                if let Some(len) = chars[i + 1..].iter().position(|&c| c == ']') {
                    let class = &chars[i + 1..i + 1 + len];
                    out.push('[');
                    let class = match class.first() {
                        Some('!') => {
                            out.push('^');
                            &class[1..]
                        }
                        _ => class,
                    };
                    for &c in class {
                        if matches!(c, '\\' | '[' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push(']');
                    i += len + 2;
                    continue;
                }
                out.push_str(r"\[");
            }
            '{' => {
                if let Some(len) = chars[i + 1..].iter().position(|&c| c == '}') {
                    let body: String = chars[i + 1..i + 1 + len].iter().collect();
                    let alts: Vec<String> = body.split(',').map(translate).collect();
                    out.push_str("(?:");
                    out.push_str(&alts.join("|"));
                    out.push(')');
                    i += len + 2;
                    continue;
                }
                out.push_str(r"\{");
            }
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(glob: &str, rel: &str) -> bool {
        let p = Pattern::new(Path::new("/w"), glob).unwrap();
        p.matches(&p.base, &Path::new("/w").join(rel))
    }

    #[test]
    fn splits_static_prefix() {
        assert_eq!(split("src/**/*.rs"), (PathBuf::from("src"), "**/*.rs".into()));
        assert_eq!(split("*.js"), (PathBuf::new(), "*.js".into()));
        assert_eq!(split("/etc/app/*.conf"), (PathBuf::from("/etc/app"), "*.conf".into()));
        assert_eq!(split("conf/app.json"), (PathBuf::from("conf"), "app.json".into()));
        assert_eq!(split("app.json"), (PathBuf::new(), "app.json".into()));
    }

    #[test]
    fn relative_base_joins_cwd() {
        let p = Pattern::new(Path::new("/srv/app"), "lib/*.js").unwrap();
        assert_eq!(p.base, PathBuf::from("/srv/app/lib"));

        let p = Pattern::new(Path::new("/srv/app"), "/etc/*.conf").unwrap();
        assert_eq!(p.base, PathBuf::from("/etc"));
    }

    #[test]
    fn star_stays_in_one_directory() {
        assert!(matches("*.js", "index.js"));
        assert!(!matches("*.js", "lib/index.js"));
        assert!(!matches("*.js", "index.json"));
    }

    #[test]
    fn double_star_crosses_directories() {
        assert!(matches("**/*.js", "index.js"));
        assert!(matches("**/*.js", "a/b/c.js"));
        assert!(matches("lib/**", "lib/a/b"));
        assert!(!matches("lib/**", "src/a"));
    }

    #[test]
    fn question_mark_classes_and_alternatives() {
        assert!(matches("log?.txt", "log1.txt"));
        assert!(!matches("log?.txt", "log12.txt"));
        assert!(matches("[ab].txt", "a.txt"));
        assert!(!matches("[!ab].txt", "a.txt"));
        assert!(matches("[!ab].txt", "c.txt"));
        assert!(matches("*.{js,ts}", "main.ts"));
        assert!(!matches("*.{js,ts}", "main.rs"));
    }

    #[test]
    fn literal_characters_are_escaped() {
        assert!(matches("a+b(1).txt", "a+b(1).txt"));
        assert!(!matches("a.txt", "abtxt"));
        assert!(matches("{oops", "{oops"));
    }

    #[test]
    fn paths_outside_root_never_match() {
        let p = Pattern::new(Path::new("/w"), "**").unwrap();
        assert!(!p.matches(Path::new("/w"), Path::new("/elsewhere/file")));
        assert!(!p.matches(Path::new("/w"), Path::new("/w")));
    }
}
