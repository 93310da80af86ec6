use crate::calc::CalcError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::TestFamily;
use rusqlite::Connection;
use serde_json::json;

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Err(err(
            &req.id,
            "bad_params",
            format!("missing {}", key),
            None,
        )),
        Some(v) => v.as_i64().ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                Some(json!({ key: v })),
            )
        }),
    }
}

pub fn optional_i64(req: &Request, key: &str) -> Result<Option<i64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => required_i64(req, key).map(Some),
    }
}

pub fn parse_family(req: &Request) -> Result<TestFamily, serde_json::Value> {
    let Some(raw) = req.params.get("family").and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", "missing family", None));
    };
    TestFamily::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "family must be one of: spelling, punctuation, stress, generic",
            Some(json!({ "family": raw })),
        )
    })
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn calc_err(req: &Request, e: CalcError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}
