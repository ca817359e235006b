//! `tacker resolve` -- dry-run a path against an object graph.
//!
//! Resolves the path exactly as a request would, then prints the terminal
//! outcome, the ancestor chain, and the evaluation trace. Exit codes map
//! the outcome: 0 for a resolved request (dispatched, index, redirect),
//! 3 for forbidden, 4 for not-found, 1 for a hard dispatch failure.

use tacker_core::{BufferedResponse, Engine, ObjectRef, Outcome, PlainRequest, Response};

use crate::OutputFormat;

pub fn run(
    engine: &Engine,
    root: ObjectRef,
    path: &str,
    roles: &[String],
    query: &[(String, String)],
    format: OutputFormat,
) -> i32 {
    let mut request = PlainRequest::new(path);
    for role in roles {
        request = request.with_role(role.clone());
    }
    for (name, value) in query {
        request = request.with_query(name.clone(), value.clone());
    }

    let mut response = BufferedResponse::new();
    let report = match engine.dispatch(root, &request, &mut response) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("dispatch failed: {e}");
            return 1;
        }
    };

    match format {
        OutputFormat::Text => print_text(&report, &response, path),
        OutputFormat::Json => print_json(&report, &response),
    }

    match report.outcome {
        Outcome::Dispatched | Outcome::IndexServed | Outcome::Redirect(_) => 0,
        Outcome::Forbidden => 3,
        Outcome::NotFound => 4,
    }
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Dispatched => "dispatched",
        Outcome::IndexServed => "index",
        Outcome::Redirect(_) => "redirect",
        Outcome::NotFound => "not-found",
        Outcome::Forbidden => "forbidden",
    }
}

fn print_text(
    report: &tacker_core::DispatchReport,
    response: &BufferedResponse,
    path: &str,
) {
    println!("path:    {path}");
    println!("outcome: {}", outcome_label(&report.outcome));
    println!("status:  {}", response.status());
    if let Outcome::Redirect(location) = &report.outcome {
        println!("location: {location}");
    }
    if !response.body().is_empty() {
        println!("body:    {}", response.body());
    }
    println!("ancestors:");
    for (i, a) in report.ancestors.entries().iter().enumerate() {
        println!(
            "  {i}. <{}> consumed={} rest=\"{}\"",
            a.node.type_name(),
            a.consumed,
            a.remainder
        );
    }
    if !report.trace.lines().is_empty() {
        println!("trace:");
        for line in report.trace.lines() {
            println!("  {line}");
        }
    }
}

fn print_json(report: &tacker_core::DispatchReport, response: &BufferedResponse) {
    let ancestors: Vec<serde_json::Value> = report
        .ancestors
        .entries()
        .iter()
        .map(|a| {
            serde_json::json!({
                "type": a.node.type_name(),
                "consumed": a.consumed,
                "remainder": a.remainder,
            })
        })
        .collect();
    let location = match &report.outcome {
        Outcome::Redirect(location) => Some(location.as_str()),
        _ => None,
    };
    let out = serde_json::json!({
        "outcome": outcome_label(&report.outcome),
        "status": response.status(),
        "location": location,
        "body": response.body(),
        "ancestors": ancestors,
        "trace": report.trace.lines(),
    });
    println!("{out}");
}
