//! HTML served by the web front end.

use modus_core::{message::Readiness, mode::ModeSelector};

const INDEX_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Modus</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
  .banner { padding: .6rem .8rem; border-radius: 6px; margin-bottom: 1rem; }
  .ok { background: #e6f4ea; color: #1e4620; }
  .fail { background: #fce8e6; color: #5f2120; }
  #log { border: 1px solid #ddd; border-radius: 6px; padding: .8rem; min-height: 12rem; white-space: pre-wrap; }
  .turn { margin-bottom: .8rem; }
  .who { font-weight: 600; }
  form { display: flex; gap: .5rem; margin-top: 1rem; }
  textarea { flex: 1; min-height: 3rem; }
  nav { text-align: right; }
</style>
</head>
<body>
<nav>{{LOGOUT}}</nav>
<h1>Modus</h1>
<div class="banner {{STATUS_CLASS}}">{{STATUS_TEXT}}</div>
<div id="log"></div>
<form id="chat">
  <select id="mode">{{MODE_OPTIONS}}</select>
  <textarea id="prompt" placeholder="Type your prompt"></textarea>
  <button type="submit">Send</button>
  <button type="button" id="clear">Clear</button>
</form>
<script>
const history = [];
const log = document.getElementById("log");

function addTurn(who, text) {
  const div = document.createElement("div");
  div.className = "turn";
  const label = document.createElement("div");
  label.className = "who";
  label.textContent = who;
  const body = document.createElement("div");
  body.textContent = text;
  div.append(label, body);
  log.append(div);
  return body;
}

document.getElementById("clear").addEventListener("click", () => {
  history.length = 0;
  log.textContent = "";
});

document.getElementById("chat").addEventListener("submit", async (event) => {
  event.preventDefault();
  const promptEl = document.getElementById("prompt");
  const prompt = promptEl.value.trim();
  if (!prompt) return;
  const mode = document.getElementById("mode").value;
  promptEl.value = "";
  addTurn("You", prompt);

  const res = await fetch("/api/chat-stream", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ prompt, mode, history }),
  });
  if (!res.ok) {
    let message = res.statusText;
    try { message = (await res.json()).error || message; } catch (_) {}
    addTurn("Error", message);
    return;
  }

  const body = addTurn("Assistant (" + (res.headers.get("X-Mode-Used") || mode) + ")", "");
  const reader = res.body.getReader();
  const decoder = new TextDecoder();
  let answer = "";
  for (;;) {
    const { done, value } = await reader.read();
    if (done) break;
    answer += decoder.decode(value, { stream: true });
    body.textContent = answer;
  }
  history.push({ role: "user", content: prompt });
  history.push({ role: "assistant", content: answer });
});
</script>
</body>
</html>
"#;

const LOGIN_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Modus: sign in</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 22rem; margin: 4rem auto; }
  label { display: block; margin-top: .8rem; }
  input { width: 100%; }
  .error { color: #a50e0e; }
</style>
</head>
<body>
<h1>Sign in</h1>
{{ERROR}}
<form method="post" action="/login">
  <label>Username <input name="username" autocomplete="username"></label>
  <label>Password <input name="password" type="password" autocomplete="current-password"></label>
  <p><button type="submit">Sign in</button></p>
</form>
</body>
</html>
"#;

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// The chat page.
pub fn index(ready: &Readiness, auth_enabled: bool) -> String {
    let options: String = ModeSelector::choices()
        .iter()
        .map(|m| format!("<option value=\"{m}\">{m}</option>"))
        .collect();
    let (class, text) = if ready.ok {
        ("ok", "Backend ready.".to_string())
    } else {
        ("fail", format!("Startup check failed: {}", ready.message))
    };
    let logout = if auth_enabled {
        "<a href=\"/logout\">Sign out</a>"
    } else {
        ""
    };

    INDEX_TEMPLATE
        .replace("{{LOGOUT}}", logout)
        .replace("{{STATUS_CLASS}}", class)
        .replace("{{STATUS_TEXT}}", &escape_html(&text))
        .replace("{{MODE_OPTIONS}}", &options)
}

/// The login form, with an optional error line.
pub fn login(error: &str) -> String {
    let error = if error.is_empty() {
        String::new()
    } else {
        format!("<p class=\"error\">{}</p>", escape_html(error))
    };
    LOGIN_TEMPLATE.replace("{{ERROR}}", &error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_index_lists_modes_and_status() {
        let page = index(&Readiness::failed("Model <x> missing"), false);
        for mode in ModeSelector::choices() {
            assert!(page.contains(&format!("<option value=\"{mode}\">")));
        }
        assert!(page.contains("Startup check failed: Model &lt;x&gt; missing"));
        assert!(!page.contains("/logout"));
    }

    #[test]
    fn test_login_error_line() {
        assert!(!login("").contains("class=\"error\""));
        assert!(login("Invalid username or password.").contains("Invalid username or password."));
    }
}
