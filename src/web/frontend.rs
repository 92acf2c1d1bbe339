//! Embedded HTML/CSS/JS frontend for the sagra web dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies.
//!
//! The page polls `/api/dashboard` once a second; the countdown and the
//! incremental fetches run server-side, so the page only mirrors them.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="it">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sagra - Ordini</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

/* Layout */
.app {
  max-width: 1400px;
  margin: 0 auto;
  padding: 24px;
}

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
  gap: 16px;
  flex-wrap: wrap;
}

header h1 { font-size: 22px; font-weight: 600; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

.controls { display: flex; align-items: center; gap: 8px; flex-wrap: wrap; }

button {
  padding: 6px 14px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  font-size: 13px;
  cursor: pointer;
}
button:hover { border-color: var(--accent); }
button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }
button.danger { color: var(--red); }
button:disabled { opacity: 0.5; cursor: default; }

input, select {
  background: var(--bg);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 5px 8px;
  font-size: 13px;
}
input.num { width: 80px; font-family: var(--mono); }

/* Refresh badge */
.refresh {
  display: flex;
  flex-direction: column;
  gap: 2px;
  min-width: 180px;
  font-size: 12px;
  color: var(--text-muted);
}
.refresh .track { height: 4px; background: var(--border); border-radius: 2px; overflow: hidden; }
.refresh .fill { height: 100%; background: var(--accent); transition: width 0.9s linear; }

/* Banner */
.banner {
  display: none;
  padding: 10px 14px;
  margin-bottom: 16px;
  border: 1px solid var(--red);
  border-radius: var(--radius);
  color: var(--red);
}
.banner.show { display: block; }

.loading { color: var(--accent); font-size: 12px; visibility: hidden; }
.loading.show { visibility: visible; }

/* Counter cards */
.cards {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
  gap: 16px;
  margin-bottom: 24px;
}

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
}

.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 10px; }

.card .figures {
  display: grid;
  grid-template-columns: repeat(3, 1fr);
  text-align: center;
  margin-bottom: 10px;
}
.card .figures .value { font-size: 26px; font-weight: 700; font-family: var(--mono); }
.card .figures .label { font-size: 11px; color: var(--text-muted); text-transform: uppercase; }

.bar { height: 8px; background: var(--border); border-radius: 4px; overflow: hidden; margin-bottom: 4px; }
.bar .fill { height: 100%; transition: width 0.4s; }
.bar .fill.complete { background: var(--green); }
.bar .fill.halfway { background: var(--yellow); }
.bar .fill.behind { background: var(--red); }
.pct { font-size: 12px; color: var(--text-muted); text-align: right; margin-bottom: 10px; }

.cooked { display: flex; gap: 6px; align-items: center; flex-wrap: wrap; }

/* Orders table */
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; }
td.num, th.num { text-align: right; font-family: var(--mono); }
td.green { background: rgba(63,185,80,0.35); }
td.yellow { background: rgba(210,153,34,0.35); }
td.red { background: rgba(248,81,73,0.35); }

.empty { color: var(--text-muted); text-align: center; padding: 32px; }

/* Configuration */
.panel { display: none; }
.panel.active { display: block; }

.config-row { display: flex; align-items: center; gap: 10px; padding: 6px 0; flex-wrap: wrap; }
.config-row label { min-width: 180px; color: var(--text-muted); }
.item-row { display: flex; align-items: center; gap: 8px; padding: 4px 0 4px 16px; }
.config-actions { display: flex; gap: 8px; margin-top: 16px; }

/* Toast */
.toast {
  position: fixed;
  bottom: 24px;
  right: 24px;
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 10px 16px;
  opacity: 0;
  transition: opacity 0.2s;
}
.toast.show { opacity: 1; }
.toast.error { border-color: var(--red); color: var(--red); }
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1>Dashboard Ordini</h1>
      <div class="subtitle">Data selezionata: <span id="selected-date">-</span></div>
    </div>
    <div class="controls">
      <div class="refresh">
        <span id="refresh-label">-</span>
        <div class="track"><div class="fill" id="refresh-fill" style="width:0%"></div></div>
      </div>
      <button id="btn-refresh">Aggiorna</button>
      <button id="btn-auto">Pausa</button>
      <button id="btn-view">Configurazione</button>
      <span class="loading" id="loading">Caricamento...</span>
    </div>
  </header>

  <div class="banner" id="banner"></div>

  <!-- Dashboard -->
  <div class="panel active" id="panel-dashboard">
    <div class="empty" id="no-counters" style="display:none">
      Per favore, imposta almeno un contatore nella configurazione.
    </div>
    <div class="cards" id="cards"></div>
    <div class="card">
      <table>
        <thead id="orders-head"></thead>
        <tbody id="orders-body"></tbody>
      </table>
    </div>
  </div>

  <!-- Configuration -->
  <div class="panel" id="panel-config">
    <div class="card">
      <div class="config-row">
        <label for="cfg-date">Data</label>
        <input type="date" id="cfg-date">
      </div>
      <div class="config-row">
        <label for="cfg-interval">Intervallo di aggiornamento (s)</label>
        <input type="text" class="num" id="cfg-interval">
      </div>
    </div>
    <div id="cfg-counters"></div>
    <div class="config-actions">
      <button id="btn-add-counter">Aggiungi contatore</button>
      <button class="primary" id="btn-save">Salva</button>
      <button id="btn-cancel">Annulla</button>
    </div>
  </div>
</div>

<div class="toast" id="toast"></div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let snapshot = null;
let lastRevision = -1;
let articles = [];
let draft = null;
let seq = 0;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  const data = await res.json();
  if (!res.ok) throw new Error(data.error || res.statusText);
  return data;
}

function toast(msg, isError) {
  const el = document.getElementById('toast');
  el.textContent = msg;
  el.className = 'toast show' + (isError ? ' error' : '');
  setTimeout(() => el.className = 'toast', 3000);
}

function esc(s) {
  const d = document.createElement('div');
  d.textContent = s == null ? '' : String(s);
  return d.innerHTML;
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------
async function poll() {
  try {
    const data = await api('GET', '/api/dashboard');
    if (data.revision !== lastRevision) {
      lastRevision = data.revision;
      snapshot = data;
      render();
    }
  } catch (e) {
    toast('Server non raggiungibile: ' + e.message, true);
  }
}

function render() {
  const d = snapshot.dashboard;
  document.getElementById('selected-date').textContent = d.selected_date;
  document.getElementById('refresh-label').textContent = d.refresh.is_active
    ? `${d.refresh.label} (${d.refresh.time_remaining}s)`
    : d.refresh.label;
  document.getElementById('refresh-fill').style.width = d.refresh.progress + '%';
  document.getElementById('btn-auto').textContent = snapshot.auto_refresh ? 'Pausa' : 'Riprendi';
  document.getElementById('loading').classList.toggle('show', d.loading);

  const banner = document.getElementById('banner');
  banner.textContent = d.error || '';
  banner.classList.toggle('show', !!d.error);

  const inConfig = snapshot.view === 'config';
  document.getElementById('panel-dashboard').classList.toggle('active', !inConfig);
  document.getElementById('panel-config').classList.toggle('active', inConfig);
  document.getElementById('btn-view').textContent = inConfig ? 'Dashboard' : 'Configurazione';
  if (inConfig) {
    if (!draft) openConfig();
    return;
  }
  draft = null;

  document.getElementById('no-counters').style.display = d.cards.length ? 'none' : 'block';
  renderCards(d.cards);
  renderOrders(d);
}

function renderCards(cards) {
  const focused = document.activeElement && document.activeElement.dataset.keep;
  if (focused) return;
  document.getElementById('cards').innerHTML = cards.map(c => `
    <div class="card">
      <h2>${esc(c.name)}</h2>
      <div class="figures">
        <div><div class="value">${c.ordered}</div><div class="label">Ordinati</div></div>
        <div><div class="value">${c.cooked}</div><div class="label">Fatti</div></div>
        <div><div class="value">${c.remaining}</div><div class="label">Da fare</div></div>
      </div>
      <div class="bar"><div class="fill ${c.tone}" style="width:${c.bar_width}%"></div></div>
      <div class="pct">${Math.round(c.percentage)}%</div>
      <div class="cooked">
        <button onclick="cooked('${esc(c.id)}', {step: -1})">-</button>
        <button onclick="cooked('${esc(c.id)}', {step: 1})">+</button>
        <input class="num" data-keep="1" placeholder="Fatti" id="set-${esc(c.id)}">
        <button onclick="cookedFrom('${esc(c.id)}', 'set', 'value')">Imposta</button>
        <input class="num" data-keep="1" placeholder="+/-" id="adj-${esc(c.id)}">
        <button onclick="cookedFrom('${esc(c.id)}', 'adj', 'adjust')">Applica</button>
      </div>
    </div>
  `).join('');
}

function renderOrders(d) {
  document.getElementById('orders-head').innerHTML = d.cards.length === 0 ? '' : `
    <tr>
      <th>Ordine</th><th>Cliente</th><th>Ora</th>
      ${d.cards.map(c => `<th class="num">${esc(c.name)}</th>`).join('')}
    </tr>`;
  document.getElementById('orders-body').innerHTML = d.rows.map(r => `
    <tr>
      <td class="num">${r.id_ordine}</td>
      <td>${esc(r.cliente)}</td>
      <td>${esc(r.ora || '')}</td>
      ${r.cells.map(cell => `<td class="num ${cell.color === 'none' ? '' : cell.color}">${cell.contribution > 0 ? cell.contribution : ''}</td>`).join('')}
    </tr>
  `).join('');
}

async function cooked(counterId, body) {
  try {
    await api('POST', '/api/cooked', Object.assign({ counterId }, body));
    poll();
  } catch (e) {
    toast(e.message, true);
  }
}

async function cookedFrom(counterId, prefix, field) {
  const input = document.getElementById(prefix + '-' + counterId);
  try {
    await api('POST', '/api/cooked', { counterId, [field]: input.value });
    input.value = '';
    input.blur();
    poll();
  } catch (e) {
    toast(e.message, true);
  }
}

// ---------------------------------------------------------------------------
// Header controls
// ---------------------------------------------------------------------------
document.getElementById('btn-refresh').addEventListener('click', async () => {
  try {
    const res = await api('POST', '/api/refresh', {});
    if (!res.started) toast('Aggiornamento già in corso');
    poll();
  } catch (e) {
    toast(e.message, true);
  }
});

document.getElementById('btn-auto').addEventListener('click', async () => {
  await api('POST', '/api/auto-refresh', {});
  poll();
});

document.getElementById('btn-view').addEventListener('click', async () => {
  if (snapshot && snapshot.view === 'config') {
    await api('POST', '/api/view', { view: 'dashboard' });
  } else {
    await openConfig();
  }
  poll();
});

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------
async function openConfig() {
  try {
    articles = await api('GET', '/api/articles');
    draft = await api('GET', '/api/configuration');
    await api('POST', '/api/view', { view: 'config' });
    renderConfig();
  } catch (e) {
    toast('Impossibile aprire la configurazione: ' + e.message, true);
  }
}

function renderConfig() {
  document.getElementById('cfg-date').value = draft.date;
  document.getElementById('cfg-interval').value = draft.interval;

  const options = sel => ['<option value="">Seleziona articolo</option>']
    .concat(articles.map(a =>
      `<option value="${a.id}" ${String(a.id) === sel ? 'selected' : ''}>${esc(a.descrizione)}</option>`))
    .join('');

  document.getElementById('cfg-counters').innerHTML = draft.counters.map((c, ci) => `
    <div class="card">
      <div class="config-row">
        <input value="${esc(c.name)}" onchange="draft.counters[${ci}].name = this.value">
        <button class="danger" onclick="removeCounter(${ci})">Rimuovi contatore</button>
      </div>
      ${c.trackedItems.map((item, ii) => `
        <div class="item-row">
          <select onchange="selectArticle(${ci}, ${ii}, this.value)">${options(item.articleId)}</select>
          <span>x</span>
          <input class="num" type="number" min="1" value="${item.moltiplicatore}"
            onchange="draft.counters[${ci}].trackedItems[${ii}].moltiplicatore = parseInt(this.value) || 1">
          <button class="danger" onclick="removeItem(${ci}, ${ii})">Rimuovi</button>
        </div>
      `).join('')}
      <div class="item-row"><button onclick="addItem(${ci})">Aggiungi articolo</button></div>
    </div>
  `).join('');
}

function selectArticle(ci, ii, id) {
  const item = draft.counters[ci].trackedItems[ii];
  const article = articles.find(a => String(a.id) === id);
  item.articleId = id;
  item.descrizione = article ? article.descrizione : '';
}

function addItem(ci) {
  draft.counters[ci].trackedItems.push({ articleId: '', descrizione: '', moltiplicatore: 1 });
  renderConfig();
}

function removeItem(ci, ii) {
  draft.counters[ci].trackedItems.splice(ii, 1);
  renderConfig();
}

function removeCounter(ci) {
  draft.counters.splice(ci, 1);
  renderConfig();
}

document.getElementById('btn-add-counter').addEventListener('click', () => {
  draft.counters.push({
    id: `counter_${Date.now()}_${seq++}`,
    name: `Contatore ${draft.counters.length + 1}`,
    trackedItems: [],
  });
  renderConfig();
});

document.getElementById('btn-save').addEventListener('click', async () => {
  draft.date = document.getElementById('cfg-date').value;
  const interval = parseInt(document.getElementById('cfg-interval').value);
  draft.interval = interval ? interval : 60;
  try {
    await api('PUT', '/api/configuration', draft);
    toast('Configurazione salvata');
    poll();
  } catch (e) {
    toast('Salvataggio non riuscito: ' + e.message, true);
  }
});

document.getElementById('btn-cancel').addEventListener('click', async () => {
  await api('POST', '/api/view', { view: 'dashboard' });
  poll();
});

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
poll();
setInterval(poll, 1000);
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_calls_every_api_route() {
        for route in [
            "/api/dashboard",
            "/api/articles",
            "/api/configuration",
            "/api/cooked",
            "/api/refresh",
            "/api/auto-refresh",
            "/api/view",
        ] {
            assert!(INDEX_HTML.contains(route), "missing {route}");
        }
    }

    #[test]
    fn page_carries_empty_state_prompt() {
        assert!(INDEX_HTML.contains(crate::dashboard::NO_COUNTERS_MESSAGE));
    }
}
