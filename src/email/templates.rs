fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Workspace name and code are user input and are escaped before rendering.
pub fn render_workspace_invite(workspace_name: &str, invite_code: &str, client_url: &str) -> String {
    let workspace_name = html_escape(workspace_name);
    let invite_code = html_escape(invite_code);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>You're invited to {workspace_name}</h2>
    <p>You've been invited to join the <strong>{workspace_name}</strong> workspace on AssignIt.</p>
    <p>Use this invite code after signing in:</p>
    <p style="font-size: 24px; letter-spacing: 4px; font-family: monospace;">{invite_code}</p>
    <p><a href="{client_url}/join?code={invite_code}" style="display: inline-block; padding: 10px 20px; background: #0070f3; color: white; text-decoration: none; border-radius: 4px;">Join Workspace</a></p>
    <p style="color: #666; font-size: 14px;">If you didn't expect this invitation, you can ignore it.</p>
</body>
</html>"#
    )
}
