//! Version comparison between the running tool and a template's declared version

use semver::Version;

/// Compare the tool version against the version a template declares.
/// Returns a warning message if the tool is older than the template expects.
pub fn check_compatibility(
    tool_version: &str,
    template_version: &str,
    upgrade_command: &str,
) -> Option<String> {
    // Unparseable versions are not compared
    let tool = parse_version(tool_version)?;
    let template = parse_version(template_version)?;

    if tool < template {
        Some(format!(
            "This template was written for version {} or newer, you are running {}.\n\
             Consider updating: {}",
            template_version, tool_version, upgrade_command
        ))
    } else {
        None
    }
}

/// Parse a version string, accepting a leading `v`
fn parse_version(version: &str) -> Option<Version> {
    let cleaned = version.trim();
    let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
    Version::parse(cleaned).ok()
}
