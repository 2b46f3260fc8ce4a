//! Rendering of resolved dependency paths.
//!
//! ```text
//! myapp@1.0 → curl@7.0 → openssl@1.1
//! a@1 → b@1 → a@1  [cycle]
//! ```

use super::color::{dimmed, error, info, warning};
use super::OutputConfig;
use crate::domain::{Resolution, ResolvedPath};
use std::io::{self, Write};

fn connector(config: &OutputConfig) -> &'static str {
    if config.use_ascii {
        " -> "
    } else {
        " → "
    }
}

/// Render one path on a single line, root first. The target hop is
/// highlighted and flags are appended as tags.
pub fn format_path(path: &ResolvedPath, config: &OutputConfig) -> String {
    let last = path.path.len().saturating_sub(1);
    let hops: Vec<String> = path
        .path
        .iter()
        .enumerate()
        .map(|(i, hop)| {
            let token = format!("{}@{}", hop.name, hop.version);
            if i == last { info(&token, config) } else { token }
        })
        .collect();

    let mut line = hops.join(&dimmed(connector(config), config));
    if path.is_cyclic {
        line.push_str(&format!("  {}", error("[cycle]", config)));
    }
    if path.max_depth_reached {
        line.push_str(&format!("  {}", warning("[depth limit]", config)));
    }
    line
}

/// Write every path of a resolution, one per line, with a summary.
pub(super) fn write_resolution<W: Write>(
    w: &mut W,
    resolution: &Resolution,
    config: &OutputConfig,
) -> io::Result<()> {
    if resolution.is_empty() {
        writeln!(w, "No dependency paths found.")?;
        return Ok(());
    }

    for path in &resolution.paths {
        writeln!(w, "{}", format_path(path, config))?;
    }

    let clean = resolution.clean_paths().count();
    writeln!(
        w,
        "\n{} path(s), {} reaching a root",
        resolution.paths.len(),
        clean
    )?;
    if resolution.truncated {
        writeln!(
            w,
            "{}",
            warning("Candidate limit reached; some paths may be missing.", config)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, PathNode};

    fn path(tokens: &[(&str, &str)], is_cyclic: bool, max_depth_reached: bool) -> ResolvedPath {
        ResolvedPath {
            path: tokens
                .iter()
                .map(|(n, v)| PathNode::from(&Coordinate::new(*n, *v)))
                .collect(),
            is_cyclic,
            max_depth_reached,
        }
    }

    #[test]
    fn test_format_plain_ascii() {
        let config = OutputConfig::new(true, false);
        let p = path(&[("openssl", "1.1"), ("curl", "7.0"), ("myapp", "1.0")], false, false);
        assert_eq!(format_path(&p, &config), "openssl@1.1 -> curl@7.0 -> myapp@1.0");
    }

    #[test]
    fn test_format_flags() {
        let config = OutputConfig::new(true, false);
        let p = path(&[("a", "1"), ("b", "1"), ("a", "1")], true, false);
        assert_eq!(format_path(&p, &config), "a@1 -> b@1 -> a@1  [cycle]");
    }

    #[test]
    fn test_write_truncated_resolution() {
        let config = OutputConfig::new(true, false);
        let resolution = Resolution {
            paths: vec![path(&[("x", "1")], false, false)],
            truncated: true,
        };
        let mut buf = Vec::new();
        write_resolution(&mut buf, &resolution, &config).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("1 path(s), 1 reaching a root"));
        assert!(text.contains("Candidate limit reached"));
    }
}
