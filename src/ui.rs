pub fn render_index(today: &str) -> String {
    INDEX_HTML.replace("{{TODAY}}", today)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
      --complete: #6cbf84;
      --partial: #f2c14e;
      --incomplete: #e9a49a;
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    h2 { margin: 0 0 12px; font-size: 1.3rem; }

    .subtitle { margin: 6px 0 0; color: #5f5c57; }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
      gap: 24px;
    }

    .card {
      background: white;
      border-radius: 20px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .calendar-head {
      display: flex;
      justify-content: space-between;
      align-items: center;
      margin-bottom: 10px;
    }

    .calendar {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 6px;
    }

    .day {
      border: none;
      border-radius: 10px;
      padding: 10px 0;
      font-weight: 600;
      cursor: pointer;
      color: var(--ink);
    }

    .day.complete { background: var(--complete); }
    .day.partial { background: var(--partial); }
    .day.incomplete { background: var(--incomplete); }
    .day.selected { outline: 3px solid var(--accent-2); }

    form.add { display: flex; gap: 8px; margin-bottom: 14px; }

    input[type="text"] {
      flex: 1;
      border-radius: 999px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      padding: 12px 16px;
      font: inherit;
    }

    button.primary {
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font: inherit;
      font-weight: 600;
      background: var(--accent);
      color: white;
      cursor: pointer;
    }

    button.ghost {
      border: none;
      background: transparent;
      color: var(--accent-2);
      font: inherit;
      cursor: pointer;
    }

    ul.habits { list-style: none; padding: 0; margin: 0; display: grid; gap: 10px; }

    ul.habits li {
      display: flex;
      align-items: center;
      justify-content: space-between;
      background: #faf6ef;
      border-radius: 14px;
      padding: 12px 14px;
    }

    .streak { margin-left: 8px; color: #8b857d; font-size: 0.9rem; }

    .metrics {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .metric .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .metric .value { font-size: 1.7rem; font-weight: 600; color: var(--accent-2); }

    .bar { height: 12px; border-radius: 999px; background: #eee4d6; overflow: hidden; }
    .bar div { height: 100%; background: var(--accent); transition: width 400ms ease; }

    #chart { width: 100%; height: 220px; display: block; }
    .chart-line { fill: none; stroke: var(--accent); stroke-width: 3; }
    .chart-grid { stroke: rgba(47, 72, 88, 0.12); }
    .chart-label { fill: #7a746d; font-size: 11px; }

    .status { min-height: 1.2em; color: #6b645d; }
    .status[data-type="error"] { color: #c63b2b; }
    .status[data-type="ok"] { color: #2d7a4b; }

    .footer { display: flex; gap: 12px; flex-wrap: wrap; }
    .footer a { text-decoration: none; }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Habit Tracker</h1>
      <p class="subtitle">Tick off habits day by day and watch the streaks grow.</p>
    </header>

    <section class="columns">
      <div class="card">
        <div class="calendar-head">
          <button class="ghost" id="prev-month" type="button">&#9664;</button>
          <strong id="month-label"></strong>
          <button class="ghost" id="next-month" type="button">&#9654;</button>
        </div>
        <div id="calendar" class="calendar"></div>
      </div>

      <div class="card">
        <form class="add" id="add-form">
          <input type="text" id="habit-name" placeholder="Enter new habit" autocomplete="off" />
          <button class="primary" type="submit">Add Habit</button>
        </form>
        <p class="subtitle">Checking off for <strong id="selected-date">{{TODAY}}</strong></p>
        <ul class="habits" id="habits"></ul>
      </div>
    </section>

    <section class="card">
      <h2>Analytics</h2>
      <div class="metrics">
        <div class="metric">
          <span class="label">Today</span>
          <span class="value" id="today-status">-</span>
        </div>
        <div class="metric">
          <span class="label">This week</span>
          <span class="value" id="weekly">0%</span>
          <div class="bar"><div id="weekly-bar" style="width: 0%"></div></div>
        </div>
        <div class="metric">
          <span class="label">Overall success</span>
          <span class="value" id="overall">0%</span>
        </div>
      </div>
      <svg id="chart" viewBox="0 0 600 220" role="img" aria-label="Completed habits over the last 30 days"></svg>
    </section>

    <section class="footer">
      <a class="primary" href="/api/report"><button class="primary" type="button">Generate Report</button></a>
      <button class="ghost" id="sync-btn" type="button">Sync now</button>
      <span class="status" id="status"></span>
    </section>
  </main>

  <script>
    const today = '{{TODAY}}';
    let selectedDate = today;
    let visibleMonth = today.slice(0, 7);
    let habits = [];

    const statusEl = document.getElementById('status');
    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const request = async (url, options = {}) => {
      const res = await fetch(url, {
        headers: { 'content-type': 'application/json' },
        ...options
      });
      if (!res.ok) {
        const msg = await res.text();
        const error = new Error(msg || 'Request failed');
        error.status = res.status;
        throw error;
      }
      return res.status === 204 ? null : res.json();
    };

    const shiftMonth = (month, delta) => {
      const [y, m] = month.split('-').map(Number);
      const d = new Date(Date.UTC(y, m - 1 + delta, 1));
      return d.toISOString().slice(0, 7);
    };

    const renderCalendar = (days) => {
      const cal = document.getElementById('calendar');
      document.getElementById('month-label').textContent = visibleMonth;
      cal.innerHTML = '';
      const offset = new Date(days[0].date + 'T00:00:00Z').getUTCDay();
      for (let i = 0; i < offset; i++) {
        cal.appendChild(document.createElement('span'));
      }
      days.forEach(({ date, status }) => {
        const tile = document.createElement('button');
        tile.type = 'button';
        tile.className = `day ${status}` + (date === selectedDate ? ' selected' : '');
        tile.textContent = Number(date.slice(8));
        tile.addEventListener('click', () => {
          selectedDate = date;
          document.getElementById('selected-date').textContent = date;
          renderHabits();
          loadCalendar().catch((err) => setStatus(err.message, 'error'));
        });
        cal.appendChild(tile);
      });
    };

    const renderHabits = (streaks = {}) => {
      const list = document.getElementById('habits');
      list.innerHTML = '';
      habits.forEach((habit) => {
        const li = document.createElement('li');
        const left = document.createElement('label');
        const box = document.createElement('input');
        box.type = 'checkbox';
        box.checked = habit.completedDates.includes(selectedDate);
        box.addEventListener('change', () => toggle(habit.id));
        left.appendChild(box);
        left.append(' ' + habit.name);
        const info = streaks[habit.id];
        if (info) {
          const streak = document.createElement('span');
          streak.className = 'streak';
          const badges = info.badges.map((b) => (b === 'trophy' ? '\u{1F3C6}' : '\u{1F525}')).join(' ');
          streak.textContent = `Streak: ${info.streak} ${badges}`;
          left.appendChild(streak);
        }
        const remove = document.createElement('button');
        remove.className = 'ghost';
        remove.type = 'button';
        remove.textContent = 'Remove';
        remove.addEventListener('click', () => removeHabit(habit.id));
        li.append(left, remove);
        list.appendChild(li);
      });
    };

    const renderChart = (series) => {
      const svg = document.getElementById('chart');
      const w = 600, h = 220, pad = 28;
      const max = Math.max(1, ...series.map((p) => p.completedCount));
      const x = (i) => pad + (i * (w - pad * 2)) / (series.length - 1);
      const y = (v) => h - pad - (v * (h - pad * 2)) / max;
      const points = series.map((p, i) => `${x(i)},${y(p.completedCount)}`).join(' ');
      let grid = '';
      for (let v = 0; v <= max; v++) {
        grid += `<line class="chart-grid" x1="${pad}" x2="${w - pad}" y1="${y(v)}" y2="${y(v)}" />`;
        grid += `<text class="chart-label" x="4" y="${y(v) + 4}">${v}</text>`;
      }
      const first = series[0].date.slice(5), last = series[series.length - 1].date.slice(5);
      svg.innerHTML = grid +
        `<polyline class="chart-line" points="${points}" />` +
        `<text class="chart-label" x="${pad}" y="${h - 6}">${first}</text>` +
        `<text class="chart-label" x="${w - pad - 30}" y="${h - 6}">${last}</text>`;
    };

    const loadCalendar = async () => {
      renderCalendar(await request(`/api/calendar?month=${visibleMonth}`));
    };

    const refresh = async () => {
      habits = await request('/api/habits');
      const stats = await request(`/api/stats?today=${today}`);
      const streaks = Object.fromEntries(stats.habits.map((h) => [h.id, h]));
      renderHabits(streaks);
      document.getElementById('today-status').textContent = stats.todayStatus;
      document.getElementById('weekly').textContent = `${stats.weeklyProgress}%`;
      document.getElementById('weekly-bar').style.width = `${stats.weeklyProgress}%`;
      document.getElementById('overall').textContent = `${stats.overallSuccessRate}%`;
      renderChart(stats.dailySeries);
      await loadCalendar();
    };

    const afterWrite = (err) => {
      if (err && err.status === 502) {
        setStatus('Saved locally, sync failed: ' + err.message, 'error');
      } else if (err) {
        setStatus(err.message, 'error');
      } else {
        setStatus('Saved', 'ok');
        setTimeout(() => setStatus('', ''), 1200);
      }
      return refresh();
    };

    const toggle = (id) =>
      request(`/api/habits/${encodeURIComponent(id)}/toggle`, {
        method: 'POST',
        body: JSON.stringify({ date: selectedDate })
      }).then(() => afterWrite(), afterWrite);

    const removeHabit = (id) =>
      request(`/api/habits/${encodeURIComponent(id)}`, { method: 'DELETE' })
        .then(() => afterWrite(), afterWrite);

    document.getElementById('add-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const input = document.getElementById('habit-name');
      request('/api/habits', { method: 'POST', body: JSON.stringify({ name: input.value }) })
        .then(() => { input.value = ''; return afterWrite(); }, afterWrite);
    });

    document.getElementById('prev-month').addEventListener('click', () => {
      visibleMonth = shiftMonth(visibleMonth, -1);
      loadCalendar().catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('next-month').addEventListener('click', () => {
      visibleMonth = shiftMonth(visibleMonth, 1);
      loadCalendar().catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('sync-btn').addEventListener('click', () => {
      setStatus('Syncing...', 'info');
      request('/api/sync', { method: 'POST' })
        .then((r) => { setStatus(`Synced ${r.habitCount} habits`, 'ok'); return refresh(); })
        .catch((err) => setStatus(err.message, 'error'));
    });

    refresh().catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;
