//! Context builder: projects the allow-listed layouts of a profile into the
//! text block the generation prompts embed.

use crate::core::profile::TemplateProfile;

/// Render the layouts context block: one line per allow-listed layout with
/// its id, name, and placeholder keys in layout order.
///
/// Deterministic for a given profile. An empty allow-list yields an empty
/// string.
pub fn layouts_context(profile: &TemplateProfile) -> String {
    let allowed = profile.allowed_ids();
    let mut lines = Vec::new();
    for layout in &profile.layouts {
        if !allowed.contains(&layout.layout_id) {
            continue;
        }
        let keys = layout
            .placeholders
            .iter()
            .map(|p| format!("'{}'", p.key))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "- Layout ID: {}, Name: '{}', Allowed Fields: [{}]",
            layout.layout_id, layout.layout_name, keys
        ));
    }
    lines.join("\n")
}
