use log::{debug, info, warn};

use instant_runoff::builder::Builder;
use instant_runoff::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::live::config_reader::*;
use crate::live::io_common::{make_rng, simplify_file_name};
use crate::live::io_csv::read_csv_ballots;
use crate::live::registry::SessionCode;

pub mod config_reader;
pub mod events;
pub mod io_common;
pub mod io_csv;
pub mod io_jsonl;
pub mod registry;
pub mod service;
pub mod session;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LiveError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line: {source}"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno}: {cell:?} is not a candidate id"))]
    CsvCell { lineno: usize, cell: String },
    #[snafu(display("I/O error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("No election with code {code}"))]
    UnknownCode { code: SessionCode },
    #[snafu(display("Voter {fingerprint} already voted in election {code}"))]
    DuplicateVoter {
        code: SessionCode,
        fingerprint: String,
    },
    #[snafu(display("Invalid signature to close election {code}"))]
    InvalidSignature { code: SessionCode },
    #[snafu(display("Could not check the signature to close election {code}: {message}"))]
    SignatureCheck { code: SessionCode, message: String },
    #[snafu(display("Malformed ballot for election {code}: {reason}"))]
    MalformedBallot { code: SessionCode, reason: String },
    #[snafu(display("Invalid candidates: {reason}"))]
    InvalidCandidates { reason: String },
    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: VotingErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type LiveResult<T> = Result<T, LiveError>;

fn candidate_name(rs: &VotingResult, cid: CandidateId) -> String {
    match rs.candidate(cid) {
        Some(c) => c.name.clone(),
        None => cid.to_string(),
    }
}

fn result_stats_to_json(rs: &VotingResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.round_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (cid, count) in round_stat.tally.iter() {
            tally.insert(candidate_name(rs, *cid), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        if let Some(elim_stats) = &round_stat.eliminated {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (cid, count) in elim_stats.transfers.iter() {
                transfers.insert(candidate_name(rs, *cid), json!(count.to_string()));
            }
            if elim_stats.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elim_stats.exhausted.to_string()),
                );
            }
            tally_results.push(json!({
                "eliminated": candidate_name(rs, elim_stats.candidate),
                "transfers": transfers
            }));
        }
        if let Some(cid) = round_stat.elected {
            tally_results.push(json!({
                "elected": candidate_name(rs, cid),
                "transfers": {}
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn build_summary_js(contest: &str, rv: &VotingResult) -> JSValue {
    json!({
        "config": {
            "contest": contest,
            "threshold": rv.threshold.to_string(),
        },
        "results": result_stats_to_json(rv),
        "winner": rv.winner.name,
        "wonByDefault": rv.won_by_default,
    })
}

fn read_election(args: &Args, path: &str, rules: &VoteRules) -> LiveResult<Builder> {
    let input_type = match &args.input_type {
        Some(x) => x.clone(),
        None if path.ends_with(".csv") => "csv".to_string(),
        None => "json".to_string(),
    };
    info!("Reading {} election from {:?}", input_type, path);
    let (builder_r, ballots) = match input_type.as_str() {
        "json" => {
            let (candidates, ballots) = read_election_json(path)?;
            (Builder::new(rules).and_then(|b| b.registered(candidates)), ballots)
        }
        "csv" => {
            let names = args.candidate.clone().unwrap_or_default();
            if names.is_empty() {
                whatever!("CSV input needs the candidate names, pass them with --candidate");
            }
            let ballots = read_csv_ballots(path)?;
            (Builder::new(rules).and_then(|b| b.candidates(&names)), ballots)
        }
        x => whatever!("Input type {:?} not supported (json or csv)", x),
    };
    let mut builder = builder_r.context(TabulationSnafu {})?;
    for ballot in ballots {
        builder.add_ballot(ballot);
    }
    Ok(builder)
}

/// Counts an election read from a file, and prints the rounds.
pub fn run_tabulation(args: &Args) -> LiveResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => LiveConfig::default(),
    };
    let rules = config.vote_rules()?;
    let mut rng = make_rng(config.random_seed()?);

    let input = match &args.input {
        Some(p) => p.clone(),
        None => whatever!("No input file given"),
    };
    let contest = config
        .contest_name
        .clone()
        .unwrap_or_else(|| simplify_file_name(&input));

    let builder = read_election(args, &input, &rules)?;
    info!("{} ballots read from {:?}", builder.ballots().len(), input);
    let res = builder.run(&mut rng);
    debug!("res {:?}", res);
    let result = res.context(TabulationSnafu {})?;

    for line in result.trace_lines() {
        info!("[AV] {}", line);
        println!("{}", line);
    }

    // Assemble the final json
    let result_js = build_summary_js(&contest, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("stats:{}", pretty_js_stats),
        Some(p) => {
            fs::write(p, &pretty_js_stats).context(IoSnafu {})?;
            info!("Summary written to {:?}", p);
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::io_common::test_path;

    fn args(input: &str) -> Args {
        Args {
            config: None,
            reference: None,
            out: None,
            input: Some(input.to_string()),
            input_type: None,
            candidate: None,
            verbose: false,
        }
    }

    fn write_tmp(name: &str, contents: &str) -> String {
        let p = test_path(name);
        fs::write(&p, contents).unwrap();
        p
    }

    const ELECTION: &str = r#"{
        "candidates": [
            {"id": 0, "name": "c0"}, {"id": 1, "name": "c1"},
            {"id": 2, "name": "c2"}, {"id": 3, "name": "c3"}
        ],
        "ballots": [
            [0, 2, 1], [3, 1], [1, 2, 3], [1, 2, 0], [0, 1, 3, 2], [3, 1, 0, 2],
            [2, 1, 0], [0], [], [], [0, 1, 3, 2], [2, 1, 3, 0], [3, 1, 0]
        ]
    }"#;

    const ORDERED: &str = r#"{"contestName": "reference", "rules": {"tiebreakMode": "useCandidateOrder"}}"#;

    fn reference_result() -> VotingResult {
        let p = write_tmp("livevote_summary_election.json", ELECTION);
        let (candidates, ballots) = read_election_json(&p).unwrap();
        let rules = VoteRules {
            tiebreak_mode: TieBreakMode::UseCandidateOrder,
        };
        run_instant_runoff(&candidates, &ballots, &rules, &mut make_rng(Some(1))).unwrap()
    }

    #[test]
    fn summary_lists_rounds() {
        let js = build_summary_js("reference", &reference_result());
        assert_eq!(js["winner"], json!("c1"));
        assert_eq!(js["wonByDefault"], json!(false));
        assert_eq!(js["config"]["threshold"], json!("7"));
        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            json!({
                "round": 1,
                "tally": {"c0": "4", "c1": "2", "c2": "2", "c3": "3"},
                "tallyResults": [{"eliminated": "c2", "transfers": {"c1": "2"}}]
            })
        );
        assert_eq!(
            results[2]["tallyResults"],
            json!([{"elected": "c1", "transfers": {}}])
        );
    }

    #[test]
    fn offline_count_matches_its_reference() {
        let input = write_tmp("livevote_offline_election.json", ELECTION);
        let config = write_tmp("livevote_offline_config.json", ORDERED);
        let summary = serde_json::to_string_pretty(&build_summary_js("reference", &reference_result())).unwrap();
        let reference = write_tmp("livevote_offline_reference.json", &summary);
        let out = test_path("livevote_offline_out.json");

        let mut a = args(&input);
        a.config = Some(config);
        a.reference = Some(reference);
        a.out = Some(out.clone());
        run_tabulation(&a).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), summary);
    }

    #[test]
    fn offline_count_detects_differences() {
        let input = write_tmp("livevote_diff_election.json", ELECTION);
        let config = write_tmp("livevote_diff_config.json", ORDERED);
        let reference = write_tmp("livevote_diff_reference.json", r#"{"results": []}"#);
        let mut a = args(&input);
        a.config = Some(config);
        a.reference = Some(reference);
        assert!(matches!(run_tabulation(&a), Err(LiveError::Whatever { .. })));
    }

    #[test]
    fn offline_csv_needs_names() {
        let input = write_tmp("livevote_names.csv", "0,1\n1\n1,0\n");
        assert!(run_tabulation(&args(&input)).is_err());

        let mut a = args(&input);
        a.candidate = Some(vec!["Anna".to_string(), "Bob".to_string()]);
        let out = test_path("livevote_names_out.json");
        a.out = Some(out.clone());
        run_tabulation(&a).unwrap();
        let js: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(js["winner"], json!("Bob"));
        assert_eq!(js["config"]["contest"], json!("livevote_names"));
    }

    #[test]
    fn unknown_input_type() {
        let input = write_tmp("livevote_unknown_type.json", ELECTION);
        let mut a = args(&input);
        a.input_type = Some("xlsx".to_string());
        assert!(run_tabulation(&a).is_err());
    }
}
