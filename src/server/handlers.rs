//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::data::Status;
use crate::inference::{InputForm, Prediction};

use super::error::{Result, ServerError};
use super::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let metadata = state.engine.metadata();
    let stats = state.engine.stats();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "type": metadata.model_type,
            "trained_at": metadata.trained_at.to_rfc3339(),
            "best_params": metadata.best_params,
            "cv_f2": metadata.cv_f2,
        },
        "uptime_secs": chrono::Utc::now().signed_duration_since(state.started_at).num_seconds(),
        "total_predictions": stats.total_predictions,
        "avg_latency_ms": stats.avg_latency_ms,
    }))
}

pub async fn get_form(State(state): State<Arc<AppState>>) -> Json<InputForm> {
    Json(state.engine.form().clone())
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: Status,
    pub dropout_probability: f64,
    pub percentage: String,
    pub verdict: String,
    pub heading: String,
    pub recommendations: Vec<String>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            status: prediction.status,
            dropout_probability: prediction.dropout_probability,
            percentage: prediction.percentage(),
            verdict: prediction.verdict(),
            heading: prediction.heading().to_string(),
            recommendations: prediction.recommendations().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Score one student. Fields left out of the body keep their form defaults.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(body) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let values = body
        .as_object()
        .ok_or_else(|| ServerError::BadRequest("Expected a JSON object of field values".to_string()))?;

    let engine = &state.engine;
    let mut record = engine.default_record();
    record.apply_json(engine.form(), values)?;

    let prediction = engine.predict(&record)?;
    info!(
        status = %prediction.status,
        probability = prediction.dropout_probability,
        "Served prediction"
    );
    Ok(Json(prediction.into()))
}

pub async fn serve_index() -> Html<&'static str> {
    Html(EMBEDDED_INDEX_HTML)
}

const EMBEDDED_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Student Dropout Prediction</title>
    <style>
        body { font-family: sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
        label { display: block; margin-top: .8rem; font-weight: 600; }
        select, input[type=range] { width: 100%; }
        #result { margin-top: 1.5rem; padding: 1rem; border-radius: 6px; display: none; }
        .dropout { background: #fde2e2; }
        .graduate { background: #e2f7e2; }
    </style>
</head>
<body>
    <h1>Student Dropout Prediction</h1>
    <form id="form"></form>
    <button id="submit">Predict</button>
    <div id="result"></div>
    <script>
    const form = document.getElementById('form');
    fetch('/api/form').then(r => r.json()).then(fields => {
        for (const f of fields.categorical) {
            const label = document.createElement('label');
            label.textContent = f.label;
            const select = document.createElement('select');
            select.name = f.name;
            for (const o of f.options) {
                const opt = document.createElement('option');
                opt.value = o; opt.textContent = o;
                select.appendChild(opt);
            }
            select.value = f.default;
            form.append(label, select);
        }
        for (const f of fields.numeric) {
            const label = document.createElement('label');
            const value = Math.min(Math.max(f.default, f.min), f.max);
            label.textContent = f.label + ': ' + value;
            const input = document.createElement('input');
            Object.assign(input, { type: 'range', name: f.name, min: f.min, max: f.max, step: f.step, value: value });
            input.oninput = () => { label.textContent = f.label + ': ' + input.value; };
            form.append(label, input);
        }
    });
    document.getElementById('submit').onclick = async () => {
        const body = {};
        for (const el of form.elements) {
            body[el.name] = el.type === 'range' ? Number(el.value) : el.value;
        }
        const res = await fetch('/api/predict', {
            method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(body)
        });
        const out = await res.json();
        const box = document.getElementById('result');
        box.style.display = 'block';
        if (out.error) { box.className = ''; box.textContent = out.message; return; }
        box.className = out.status === 'Dropout' ? 'dropout' : 'graduate';
        box.innerHTML = '<strong>' + out.verdict + '</strong><p>' + out.heading + '</p><ul>' +
            out.recommendations.map(r => '<li>' + r + '</li>').join('') + '</ul>';
    };
    </script>
</body>
</html>
"#;
