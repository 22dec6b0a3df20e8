use anyhow::{anyhow, bail, Context, Result};
use beamline_editor::{
    element::ElementId,
    persistence::{JsonFileStore, Store},
    session::EditorSession,
    validate, SCHEMA,
};
use serde::Serialize;
use std::env;

const DEFAULT_STATE_PATH: &str = ".beamline_state.json";

#[derive(Serialize)]
struct ElementSummary {
    id: u64,
    #[serde(rename = "type")]
    element_type: String,
    title: String,
    position: f64,
    valid: bool,
}

#[derive(Serialize)]
struct StateSummary {
    element_count: usize,
    beamline_valid: bool,
    elements: Vec<ElementSummary>,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  beamline_cli [--state PATH] list\n  \
  beamline_cli [--state PATH] types\n  \
  beamline_cli [--state PATH] add TYPE [TITLE]\n  \
  beamline_cli [--state PATH] insert INDEX TYPE\n  \
  beamline_cli [--state PATH] move INDEX ID\n  \
  beamline_cli [--state PATH] remove ID\n  \
  beamline_cli [--state PATH] validate\n  \
  beamline_cli [--state PATH] commit\n  \
  beamline_cli [--state PATH] discard\n  \
  beamline_cli [--state PATH] export-state PATH"
    );
}

fn parse_global_state_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--state" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_STATE_PATH.to_string(), 1)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn summarize(session: &EditorSession) -> StateSummary {
    let elements = session
        .beamline()
        .iter()
        .map(|item| ElementSummary {
            id: item.id.map(|id| id.0).unwrap_or(0),
            element_type: item.element_type.clone(),
            title: item.title.clone(),
            position: item.position,
            valid: validate::is_item_valid(Some(item), session.catalog()),
        })
        .collect();
    StateSummary {
        element_count: session.beamline().len(),
        beamline_valid: session.is_beamline_valid(),
        elements,
    }
}

fn commit(session: &mut EditorSession, store: &mut JsonFileStore) -> Result<()> {
    // Saving an invalid beamline is blocked here by convention, the way the
    // editor UI hides its save button; the session itself never refuses.
    if !session.is_beamline_valid() {
        bail!("Beamline has invalid elements; fix them before saving");
    }
    let tracked = session.tracked_names();
    let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
    session
        .commit(&tracked, store, |_| {})
        .map_err(|e| anyhow!("Could not save beamline state: {e}"))
}

fn parse_id(text: &str) -> Result<ElementId> {
    let raw: u64 = text
        .parse()
        .with_context(|| format!("Invalid element id '{text}'"))?;
    Ok(ElementId(raw))
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let (state_path, cmd_start) = parse_global_state_arg(&args);
    if args.len() <= cmd_start {
        usage();
        bail!("No command given");
    }

    let mut store = JsonFileStore::new(&state_path);
    let state = store
        .load()
        .map_err(|e| anyhow!("Could not load state '{state_path}': {e}"))?;
    let mut session = EditorSession::new(state);

    let cmd = args[cmd_start].as_str();
    let rest = &args[cmd_start + 1..];
    dispatch(cmd, rest, &mut session, &mut store)
}

fn dispatch(
    cmd: &str,
    rest: &[String],
    session: &mut EditorSession,
    store: &mut JsonFileStore,
) -> Result<()> {
    match (cmd, rest) {
        ("list", []) => print_json(&summarize(session))?,
        ("types", []) => print_json(&SCHEMA.element_types())?,
        ("add", [type_tag, title @ ..]) => {
            let mut template = session
                .new_element(type_tag)
                .ok_or_else(|| anyhow!("Unknown element type '{type_tag}'"))?;
            if let [title] = title {
                template.title = title.clone();
            }
            let id = session.add_element(template);
            commit(session, store)?;
            println!("Added element {id}");
        }
        ("insert", [index, type_tag]) => {
            let index: usize = index
                .parse()
                .with_context(|| format!("Invalid index '{index}'"))?;
            if index > session.beamline().len() {
                bail!(
                    "Index {index} out of range for {} elements",
                    session.beamline().len()
                );
            }
            let template = session
                .new_element(type_tag)
                .ok_or_else(|| anyhow!("Unknown element type '{type_tag}'"))?;
            let id = session.insert_element_at(index, template);
            commit(session, store)?;
            println!("Inserted element {id} at index {index}");
        }
        ("move", [index, id]) => {
            let index: usize = index
                .parse()
                .with_context(|| format!("Invalid index '{index}'"))?;
            let id = parse_id(id)?;
            if session.beamline().index_of(id).is_none() {
                bail!("No element with id {id}");
            }
            if index > session.beamline().len() {
                bail!(
                    "Index {index} out of range for {} elements",
                    session.beamline().len()
                );
            }
            session.move_element(index, id);
            commit(session, store)?;
            println!("Moved element {id} to index {index}");
        }
        ("remove", [id]) => {
            let id = parse_id(id)?;
            if session.beamline().index_of(id).is_none() {
                bail!("No element with id {id}");
            }
            let removed = session.remove_element(id);
            commit(session, store)?;
            println!("Removed element {id} ({})", removed.title);
        }
        ("validate", []) => {
            print_json(&summarize(session))?;
            if !session.is_beamline_valid() {
                bail!("Beamline has invalid elements");
            }
        }
        ("commit", []) => {
            commit(session, store)?;
            println!("Saved beamline state");
        }
        ("discard", []) => {
            let tracked = session.tracked_names();
            let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
            session.rollback(&tracked);
            println!("Discarded pending changes");
        }
        ("export-state", [path]) => {
            let mut out = JsonFileStore::new(path);
            out.save(session.models())
                .map_err(|e| anyhow!("Could not write state '{path}': {e}"))?;
            println!("Exported state to {path}");
        }
        _ => {
            usage();
            bail!("Unknown command '{cmd}'");
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
