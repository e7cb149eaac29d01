//! Embedded preview shell.
//!
//! A single self-contained HTML page: a header bar, a frame showing the
//! previewed content, and the WebSocket client that executes reload and
//! scroll-preservation messages. The shell echoes the session token (`v`
//! query parameter) of the content it finished loading, which lets the
//! server discard completions belonging to superseded reloads.

/// The preview shell page served at `/`.
pub(crate) const SHELL_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>peek</title>
<style>
  :root { --bar-height: 2.2rem; }
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { height: 100vh; display: flex; flex-direction: column;
         font: 13px/1.4 -apple-system, "Segoe UI", sans-serif; }
  #bar { height: var(--bar-height); display: flex; align-items: center;
         gap: 0.6rem; padding: 0 0.8rem; background: #1e1e1e; color: #ccc; }
  #dot { width: 8px; height: 8px; border-radius: 50%; background: #d33; }
  #dot.live { background: #3a3; }
  #file { overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
  #view { flex: 1; border: 0; width: 100%; }
</style>
</head>
<body>
<div id="bar"><span id="dot"></span><span id="file">no document</span></div>
<iframe id="view" src="/content"></iframe>
<script>
  const view = document.getElementById('view');
  const dot = document.getElementById('dot');
  const file = document.getElementById('file');
  let ws = null;

  function send(msg) {
    if (ws && ws.readyState === WebSocket.OPEN) {
      ws.send(JSON.stringify(msg));
    }
  }

  function contentToken() {
    try {
      return new URLSearchParams(view.contentWindow.location.search).get('v');
    } catch (e) {
      return null;
    }
  }

  view.addEventListener('load', () => {
    const token = contentToken();
    if (token) {
      send({ type: 'loaded', token: token });
    }
  });

  function handle(msg) {
    if (msg.type === 'load') {
      view.src = msg.locator;
    } else if (msg.type === 'query_offset') {
      let value = 0;
      try { value = Math.round(view.contentWindow.scrollY || 0); } catch (e) {}
      send({ type: 'offset', value: value });
    } else if (msg.type === 'apply_offset') {
      try { view.contentWindow.scrollTo(0, msg.value); } catch (e) {}
    }
  }

  function connect() {
    const proto = location.protocol === 'https:' ? 'wss' : 'ws';
    ws = new WebSocket(proto + '://' + location.host + '/ws');
    ws.onopen = () => dot.classList.add('live');
    ws.onmessage = (event) => handle(JSON.parse(event.data));
    ws.onclose = () => {
      dot.classList.remove('live');
      setTimeout(connect, 1000);
    };
  }

  async function refreshStatus() {
    try {
      const status = await (await fetch('/api/status')).json();
      file.textContent = status.file || 'no document';
    } catch (e) {}
  }

  refreshStatus();
  setInterval(refreshStatus, 5000);
  connect();
</script>
</body>
</html>
"##;

/// Placeholder served from `/content` while no document is selected.
pub(crate) const NO_DOCUMENT_HTML: &str = "<!doctype html>\
<html><body><p style=\"font-family: sans-serif; color: #888; padding: 2rem;\">\
No document selected. POST a path to /api/file or start the server with a file.\
</p></body></html>";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_wires_the_protocol() {
        // The shell must speak every message the surface sends and echo the
        // content token on completion.
        assert!(SHELL_HTML.contains("'load'"));
        assert!(SHELL_HTML.contains("'query_offset'"));
        assert!(SHELL_HTML.contains("'apply_offset'"));
        assert!(SHELL_HTML.contains("'loaded'"));
        assert!(SHELL_HTML.contains("'offset'"));
        assert!(SHELL_HTML.contains("/ws"));
        assert!(SHELL_HTML.contains("get('v')"));
    }

    #[test]
    fn test_shell_loads_content_without_websocket() {
        // With live reload disabled the frame still shows the document
        assert!(SHELL_HTML.contains("src=\"/content\""));
    }
}
