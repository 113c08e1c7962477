use crate::view_model::Severity;
use crate::{
    Cadence, Command, ControlAction, DashboardState, Effect, HistoryFilter, JobId, JobStatus, Msg,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: DashboardState, msg: Msg) -> (DashboardState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputSubmitted(raw) => match parse_input(&raw) {
            Ok(None) => Vec::new(),
            Ok(Some(input)) => apply_input(&mut state, input),
            Err(reason) => {
                state.notify(Severity::Error, reason);
                Vec::new()
            }
        },
        Msg::ActiveJobsRefreshed(snapshot) => {
            state.set_registry(snapshot);
            Vec::new()
        }
        Msg::WorkersRefreshed { snapshot, error } => {
            state.set_workers(snapshot, error);
            Vec::new()
        }
        Msg::HistoryLoaded { jobs, error } => {
            state.set_history(jobs, error);
            Vec::new()
        }
        Msg::DetailsLoaded { job_id, result } => {
            match result {
                Ok(job) => state.set_details(job),
                Err(err) => {
                    state.clear_details(Some(job_id));
                    state.notify(Severity::Error, format!("details for job {job_id}: {err}"));
                }
            }
            Vec::new()
        }
        Msg::CommandSettled { command, result } => {
            match (&command, result) {
                (Command::Create { .. }, Ok(job_id)) => {
                    state.notify(Severity::Info, format!("job {job_id} created"));
                }
                (Command::Control { action, .. }, Ok(job_id)) => {
                    state.notify(Severity::Info, format!("job {job_id}: {action} accepted"));
                }
                (_, Err(err)) => {
                    state.notify(Severity::Error, format!("{}: {err}", describe(&command)));
                }
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Command(Command),
    History(HistoryFilter),
    Details(JobId),
    CloseDetails,
    Refresh,
    Cadence(Cadence),
    Quit,
}

fn apply_input(state: &mut DashboardState, input: Input) -> Vec<Effect> {
    match input {
        Input::Command(command) => {
            state.notify(Severity::Info, format!("{}...", describe(&command)));
            vec![Effect::Dispatch(command)]
        }
        Input::History(filter) => vec![Effect::LoadHistory(filter)],
        Input::Details(job_id) => vec![Effect::LoadDetails(job_id)],
        Input::CloseDetails => {
            state.clear_details(None);
            Vec::new()
        }
        Input::Refresh => vec![Effect::RefreshNow],
        Input::Cadence(cadence) => {
            if state.set_cadence(cadence) {
                vec![Effect::SetCadence(cadence)]
            } else {
                Vec::new()
            }
        }
        Input::Quit => vec![Effect::Quit],
    }
}

fn describe(command: &Command) -> String {
    match command {
        Command::Control { job_id, action } => format!("{action} job {job_id}"),
        Command::Create {
            structure_id,
            leads_target,
            ..
        } => format!("create job for structure {structure_id} ({leads_target} leads)"),
    }
}

fn parse_input(raw: &str) -> Result<Option<Input>, String> {
    let mut words = raw.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let verb = verb.to_ascii_lowercase();

    if let Some(action) = ControlAction::parse(&verb) {
        let job_id = words
            .next()
            .ok_or_else(|| format!("usage: {verb} <job id>"))?
            .parse()
            .map_err(|_| format!("{verb}: job id must be a number"))?;
        return Ok(Some(Input::Command(Command::Control { job_id, action })));
    }

    let input = match verb.as_str() {
        "create" => {
            let usage = "usage: create <structure id> <leads> [notes]";
            let structure_id = words
                .next()
                .ok_or(usage)?
                .parse()
                .map_err(|_| "create: structure id must be a number".to_string())?;
            let leads_target = words
                .next()
                .ok_or(usage)?
                .parse()
                .map_err(|_| "create: leads must be an integer".to_string())?;
            let notes = words.collect::<Vec<_>>().join(" ");
            Input::Command(Command::Create {
                structure_id,
                leads_target,
                notes,
            })
        }
        "history" => {
            let mut filter = HistoryFilter::default();
            let rest: Vec<&str> = words.collect();
            let name_words = match rest.first() {
                Some(&"all") => &rest[1..],
                Some(first) => match JobStatus::from(*first) {
                    JobStatus::Other(_) => &rest[..],
                    status => {
                        filter.status = Some(status);
                        &rest[1..]
                    }
                },
                None => &rest[..],
            };
            if !name_words.is_empty() {
                filter.name = Some(name_words.join(" "));
            }
            Input::History(filter)
        }
        "details" => match words.next() {
            Some(raw) => Input::Details(
                raw.parse()
                    .map_err(|_| "details: job id must be a number".to_string())?,
            ),
            None => return Err("usage: details <job id>".to_string()),
        },
        "close" => Input::CloseDetails,
        "refresh" => Input::Refresh,
        "watch" => Input::Cadence(Cadence::Watch),
        "summary" => Input::Cadence(Cadence::Summary),
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_ignored() {
        assert_eq!(parse_input("   "), Ok(None));
    }

    #[test]
    fn history_accepts_status_and_name() {
        let parsed = parse_input("history failed acme leads").unwrap();
        assert_eq!(
            parsed,
            Some(Input::History(HistoryFilter {
                name: Some("acme leads".to_string()),
                status: Some(JobStatus::Failed),
                ..HistoryFilter::default()
            }))
        );

        let parsed = parse_input("history acme").unwrap();
        assert_eq!(
            parsed,
            Some(Input::History(HistoryFilter {
                name: Some("acme".to_string()),
                ..HistoryFilter::default()
            }))
        );
    }

    #[test]
    fn create_keeps_out_of_range_leads_for_the_dispatcher() {
        let parsed = parse_input("create 7 -3 first run").unwrap();
        assert_eq!(
            parsed,
            Some(Input::Command(Command::Create {
                structure_id: 7,
                leads_target: -3,
                notes: "first run".to_string(),
            }))
        );
    }

    #[test]
    fn details_takes_a_job_id() {
        assert_eq!(parse_input("details 12"), Ok(Some(Input::Details(12))));
        assert!(parse_input("details").is_err());
        assert!(parse_input("details twelve").is_err());
    }

    #[test]
    fn control_requires_numeric_id() {
        assert!(parse_input("pause").is_err());
        assert!(parse_input("pause abc").is_err());
    }
}
