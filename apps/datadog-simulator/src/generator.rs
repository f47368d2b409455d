//! Query parsing and synthetic series generation

use rand::Rng;
use serde::Serialize;

/// Seconds between generated points
pub const POINT_INTERVAL_SECS: i64 = 20;

/// Series emitted per query when grouping by `instance`
const GROUPED_INSTANCES: usize = 4;

/// The parts of a metrics expression the simulator understands:
/// `[aggr:]metric{tag:value,...} [by {key,...}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub aggregation: String,
    pub metric: String,
    pub tags: Vec<String>,
    pub group_by: Vec<String>,
}

impl ParsedQuery {
    pub fn parse(expression: &str) -> Option<Self> {
        let (head, rest) = expression.split_once('{')?;

        let head = head.trim();
        let (aggregation, metric) = match head.split_once(':') {
            Some((aggr, metric)) => (aggr.trim(), metric.trim()),
            None => ("avg", head),
        };
        if metric.is_empty() {
            return None;
        }

        let (scope, tail) = rest.split_once('}').unwrap_or((rest, ""));
        let tags = scope
            .split(',')
            .map(str::trim)
            .filter(|tag| tag.contains(':'))
            .map(str::to_string)
            .collect();

        let group_by = tail
            .trim_start()
            .strip_prefix("by")
            .and_then(|by| by.trim_start().strip_prefix('{'))
            .and_then(|by| by.split_once('}'))
            .map(|(keys, _)| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            aggregation: aggregation.to_string(),
            metric: metric.to_string(),
            tags,
            group_by,
        })
    }

    fn grouped_by_instance(&self) -> bool {
        self.group_by.iter().any(|k| k.contains("instance"))
    }
}

/// One series in a query response
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedSeries {
    pub aggr: String,
    pub attributes: serde_json::Value,
    pub display_name: String,
    pub end: i64,
    pub expression: String,
    pub interval: i64,
    pub length: usize,
    pub metric: String,
    pub pointlist: Vec<[f64; 2]>,
    pub query_index: u32,
    pub scope: String,
    pub start: i64,
    pub tag_set: Vec<String>,
    pub unit: Option<String>,
}

/// Body of a successful `/api/v1/query` call
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub res_type: String,
    pub resp_version: u32,
    pub query: String,
    pub from_date: i64,
    pub to_date: i64,
    pub series: Vec<SimulatedSeries>,
    pub values: Vec<f64>,
    pub times: Vec<i64>,
    pub message: String,
    pub group_by: Vec<String>,
}

/// Build a full response for `query` over `[from, to]` (Unix seconds)
pub fn simulate<R: Rng>(
    rng: &mut R,
    expression: &str,
    query: &ParsedQuery,
    from: i64,
    to: i64,
) -> QueryResponse {
    let instances = if query.grouped_by_instance() {
        GROUPED_INSTANCES
    } else {
        1
    };

    let series = (0..instances)
        .map(|instance| {
            let mut tag_set = query.tags.clone();
            if instances > 1 {
                tag_set.push(format!("instance:{}", instance));
            }
            let pointlist = generate_pointlist(rng, from, to, POINT_INTERVAL_SECS);

            SimulatedSeries {
                aggr: query.aggregation.clone(),
                attributes: serde_json::json!({}),
                display_name: query.metric.clone(),
                end: to * 1000,
                expression: format!(
                    "{}:{}{{{}}}",
                    query.aggregation,
                    query.metric,
                    query.tags.join(",")
                ),
                interval: POINT_INTERVAL_SECS,
                length: pointlist.len(),
                metric: query.metric.clone(),
                pointlist,
                query_index: 0,
                scope: tag_set.join(","),
                start: from * 1000,
                tag_set,
                unit: None,
            }
        })
        .collect();

    QueryResponse {
        status: "ok".to_string(),
        res_type: "time_series".to_string(),
        resp_version: 1,
        query: expression.to_string(),
        from_date: from * 1000,
        to_date: to * 1000,
        series,
        values: Vec::new(),
        times: Vec::new(),
        message: String::new(),
        group_by: query.group_by.clone(),
    }
}

/// Points every `interval` seconds from `from` to `to` inclusive: a slow sine
/// wave around a random base with noise and occasional spikes, never negative.
pub fn generate_pointlist<R: Rng>(rng: &mut R, from: i64, to: i64, interval: i64) -> Vec<[f64; 2]> {
    let start_ms = from * 1000;
    let end_ms = to * 1000;
    let step_ms = interval.max(1) * 1000;
    let base = rng.gen_range(2.0..10.0);

    let mut points = Vec::new();
    let mut current = start_ms;
    while current <= end_ms {
        let t = (current - start_ms) as f64 / 1000.0;
        let mut value: f64 = base + (t / 100.0).sin() * 3.0 + rng.gen_range(-2.0..2.0);
        if rng.gen_bool(0.05) {
            value += rng.gen_range(20.0..50.0);
        }
        points.push([current as f64, value.max(0.0)]);
        current += step_ms;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_full_expression() {
        let q = ParsedQuery::parse("avg:processor.time{host:AH-CW-AP-104} by {host,instance}").unwrap();
        assert_eq!(q.aggregation, "avg");
        assert_eq!(q.metric, "processor.time");
        assert_eq!(q.tags, vec!["host:AH-CW-AP-104"]);
        assert_eq!(q.group_by, vec!["host", "instance"]);
    }

    #[test]
    fn test_parse_defaults_and_wildcards() {
        let q = ParsedQuery::parse("system.load.1{*}").unwrap();
        assert_eq!(q.aggregation, "avg");
        assert_eq!(q.metric, "system.load.1");
        assert!(q.tags.is_empty());
        assert!(q.group_by.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_scope_or_metric() {
        assert!(ParsedQuery::parse("avg:processor.time").is_none());
        assert!(ParsedQuery::parse("{host:a}").is_none());
        assert!(ParsedQuery::parse("").is_none());
    }

    #[test]
    fn test_pointlist_spacing_and_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = generate_pointlist(&mut rng, 1_000, 1_100, 20);

        assert_eq!(points.len(), 6);
        assert_eq!(points[0][0], 1_000_000.0);
        assert_eq!(points[5][0], 1_100_000.0);
        assert!(points.iter().all(|p| p[1] >= 0.0));
    }

    #[test]
    fn test_pointlist_empty_when_range_inverted() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generate_pointlist(&mut rng, 2_000, 1_000, 20).is_empty());
    }

    #[test]
    fn test_simulate_grouped_by_instance() {
        let mut rng = StdRng::seed_from_u64(1);
        let expression = "avg:processor.time{host:a} by {host,instance}";
        let query = ParsedQuery::parse(expression).unwrap();
        let response = simulate(&mut rng, expression, &query, 0, 60);

        assert_eq!(response.status, "ok");
        assert_eq!(response.series.len(), 4);
        assert_eq!(response.series[2].scope, "host:a,instance:2");
        assert_eq!(response.series[2].tag_set, vec!["host:a", "instance:2"]);
        assert_eq!(response.series[0].expression, "avg:processor.time{host:a}");
        assert_eq!(response.series[0].length, 4);
    }

    #[test]
    fn test_simulate_single_series() {
        let mut rng = StdRng::seed_from_u64(1);
        let expression = "max:disk.used{host:a,device:sda}";
        let query = ParsedQuery::parse(expression).unwrap();
        let response = simulate(&mut rng, expression, &query, 0, 0);

        assert_eq!(response.series.len(), 1);
        assert_eq!(response.series[0].scope, "host:a,device:sda");
        assert_eq!(response.series[0].aggr, "max");
        assert_eq!(response.series[0].pointlist.len(), 1);
    }
}
