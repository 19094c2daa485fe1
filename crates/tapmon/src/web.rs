//! The embedded single-page dashboard.
//!
//! Served at `/` with no build step or external assets. Polls the snapshot
//! endpoint with the last seen table version so unchanged state costs one
//! 304 round trip.

use axum::response::Html;

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>tapmon</title>
<style>
  body { background: #2b2b2b; color: #ccc; font-family: sans-serif; margin: 0; }
  header { padding: 12px 20px; background: #222; display: flex; align-items: center; gap: 16px; }
  header h1 { font-size: 18px; color: #ffaa44; margin: 0; }
  header button { background: #363636; color: #ccc; border: 1px solid #555; border-radius: 4px;
                  padding: 6px 12px; cursor: pointer; }
  header button.active { border-color: #ffaa44; color: #ffaa44; }
  #status { margin-left: auto; font-size: 12px; color: #888; }
  main { padding: 16px 20px; }
  .card { background: #363636; border: 1px solid #555; border-radius: 8px; margin-bottom: 16px;
          padding: 12px; }
  .card-head { display: flex; align-items: baseline; gap: 12px; margin-bottom: 8px; }
  .name { font-size: 15px; font-weight: bold; color: #eee; outline: none; padding: 2px 6px;
          border-radius: 4px; }
  .name:focus { background: #2b2b2b; }
  .meta { font-size: 12px; color: #999; }
  .delete { margin-left: auto; background: none; color: #c66; border: 1px solid #c66;
            border-radius: 4px; padding: 2px 8px; cursor: pointer; }
  .chart svg { width: 100%; height: auto; }
  .empty { color: #888; padding: 40px; text-align: center; }
</style>
</head>
<body>
<header>
  <h1>tapmon</h1>
  <button id="tab-sessions" class="active">Sessions</button>
  <button id="tab-aggregate">Aggregate</button>
  <span id="status"></span>
</header>
<main id="content"><div class="empty">Waiting for sessions...</div></main>
<script>
  const POLL_MS = 2000;
  let view = 'sessions';
  let version = null;

  document.getElementById('tab-sessions').onclick = () => switchView('sessions');
  document.getElementById('tab-aggregate').onclick = () => switchView('aggregate');

  function switchView(next) {
    view = next;
    version = null;
    document.getElementById('tab-sessions').classList.toggle('active', next === 'sessions');
    document.getElementById('tab-aggregate').classList.toggle('active', next === 'aggregate');
    refresh();
  }

  async function refresh() {
    try {
      if (view === 'sessions') {
        const url = version === null ? '/api/snapshot' : `/api/snapshot?since=${version}`;
        const res = await fetch(url);
        if (res.status === 304) return;
        const data = await res.json();
        version = data.version;
        renderSessions(data);
      } else {
        const res = await fetch('/api/aggregate');
        const data = await res.json();
        if (data.version === version) return;
        version = data.version;
        document.getElementById('content').innerHTML =
          `<div class="card"><div class="chart">${data.chart_svg}</div></div>`;
      }
      setStatus('');
    } catch (e) {
      setStatus('connection lost, retrying');
    }
  }

  function renderSessions(data) {
    const main = document.getElementById('content');
    if (data.sessions.length === 0) {
      main.innerHTML = '<div class="empty">No sessions yet. Drop CSV files into the watched directory.</div>';
      return;
    }
    main.innerHTML = '';
    for (const s of data.sessions) {
      const card = document.createElement('div');
      card.className = 'card';

      const head = document.createElement('div');
      head.className = 'card-head';

      const name = document.createElement('span');
      name.className = 'name';
      name.contentEditable = 'true';
      name.textContent = s.display_name;
      name.onkeydown = (e) => { if (e.key === 'Enter') { e.preventDefault(); name.blur(); } };
      name.onblur = () => rename(s.id, name.textContent, s.display_name, name);
      head.appendChild(name);

      const meta = document.createElement('span');
      meta.className = 'meta';
      const bits = [new Date(s.captured_at).toLocaleString()];
      if (s.peak_bpm !== null) bits.push(`peak ${s.peak_bpm.toFixed(1)} BPM`);
      if (s.best_ur !== null) bits.push(`best UR ${s.best_ur.toFixed(1)}`);
      meta.textContent = bits.join(' / ');
      head.appendChild(meta);

      const del = document.createElement('button');
      del.className = 'delete';
      del.textContent = 'delete';
      del.onclick = () => removeSession(s.id, s.display_name);
      head.appendChild(del);

      card.appendChild(head);

      const chart = document.createElement('div');
      chart.className = 'chart';
      if (s.artifact_svg !== null) {
        chart.innerHTML = s.artifact_svg;
      } else {
        chart.innerHTML = '<div class="empty">chart unavailable</div>';
      }
      card.appendChild(chart);
      main.appendChild(card);
    }
  }

  async function rename(id, next, previous, el) {
    const name = next.trim();
    if (name === '' || name === previous) { el.textContent = previous; return; }
    const res = await fetch(`/api/sessions/${id}/rename`, {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ name }),
    });
    if (!res.ok) { el.textContent = previous; setStatus('rename failed'); }
  }

  async function removeSession(id, name) {
    if (!confirm(`Delete session "${name}" and its files?`)) return;
    const res = await fetch(`/api/sessions/${id}`, { method: 'DELETE' });
    if (!res.ok) setStatus('delete failed');
    version = null;
    refresh();
  }

  function setStatus(text) {
    document.getElementById('status').textContent = text;
  }

  refresh();
  setInterval(refresh, POLL_MS);
</script>
</body>
</html>
"#;
