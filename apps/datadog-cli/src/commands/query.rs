//! Query command

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use datadog_datasource::{
    DataQuery, Datasource, DatasourceSettings, FieldValues, Frame, PluginContext, TimeRange,
};
use serde_json::json;

use crate::output::{self, OutputFormat};

pub struct QueryArgs {
    pub expression: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub last_minutes: i64,
    pub show_points: bool,
}

/// Explicit bounds win; otherwise the window ends now and spans `last_minutes`
pub fn resolve_range(args: &QueryArgs, now: DateTime<Utc>) -> TimeRange {
    let to = args.to.unwrap_or(now);
    let from = args
        .from
        .unwrap_or_else(|| to - Duration::minutes(args.last_minutes));
    TimeRange::new(from, to)
}

pub async fn run(settings: DatasourceSettings, args: QueryArgs, format: OutputFormat) -> Result<()> {
    let datasource = Datasource::new(settings)?;
    let range = resolve_range(&args, Utc::now());
    let query = DataQuery::new("A", range, json!({ "query": args.expression }));

    let ctx = PluginContext::new(0, "datadog-cli");
    let cancel = ctx.cancellation.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = datasource.execute(&ctx, &query).await;
    interrupt.abort();
    let frames = result?;

    if let Some(rendered) = output::format_structured(&frames, format)? {
        println!("{}", rendered);
        return Ok(());
    }

    output::key_value(
        "Range",
        &format!("{} .. {}", range.from.to_rfc3339(), range.to.to_rfc3339()),
    );
    if frames.iter().all(Frame::is_empty) {
        output::warning("No data points returned");
    }
    for frame in &frames {
        print_frame(frame, args.show_points);
    }

    Ok(())
}

fn print_frame(frame: &Frame, show_points: bool) {
    let (Some(time_field), Some(value_field)) = (frame.fields.first(), frame.fields.get(1)) else {
        return;
    };
    let (FieldValues::Time(times), FieldValues::Float64(values)) =
        (&time_field.values, &value_field.values)
    else {
        return;
    };

    let label = if value_field.name.is_empty() {
        "(no scope)"
    } else {
        value_field.name.as_str()
    };
    println!("{} {} points", label.bold(), values.len());

    if let Some(summary) = summarize(values) {
        println!(
            "  min {:.3}  max {:.3}  last {:.3}",
            summary.min, summary.max, summary.last
        );
    }

    if show_points {
        for (time, value) in times.iter().zip(values) {
            println!("  {}  {}", time.to_rfc3339(), value);
        }
    }
}

#[derive(Debug, PartialEq)]
struct Summary {
    min: f64,
    max: f64,
    last: f64,
}

fn summarize(values: &[f64]) -> Option<Summary> {
    let last = *values.last()?;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    Some(Summary { min, max, last })
}
