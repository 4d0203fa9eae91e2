extern crate log;
extern crate pretty_env_logger;

use std::path::Path;
use std::process::exit;

use clap::{arg, command, Command};

use crate::calibration::Calibration;
use crate::interpret::{interpret_form, InterpretError, InterpretOptions};
use crate::report::{format_json, format_text};
use crate::template::Template;

mod calibration;
mod classify;
mod debug;
mod geometry;
mod image_utils;
mod interpret;
mod lines;
mod report;
mod template;
mod types;

/// Exit status when the template has nothing to score.
const EXIT_NO_WORK: i32 = 2;

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let debug = matches.get_flag("debug");
    let with_scores = matches.get_flag("scores");
    let json = matches.get_flag("json");
    let image_path = matches
        .get_one::<String>("image_path")
        .expect("image path is required");
    let template_path = matches
        .get_one::<String>("template")
        .expect("template path is required");

    let template = match Template::load(Path::new(template_path)) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Error loading template: {}", e);
            exit(1);
        }
    };

    let calibration = match matches.get_one::<String>("calibration") {
        Some(path) => match Calibration::load(Path::new(path)) {
            Ok(calibration) => calibration,
            Err(e) => {
                eprintln!("Error loading calibration: {}", e);
                exit(1);
            }
        },
        None => Calibration::default(),
    };

    let options = InterpretOptions { debug, calibration };

    match interpret_form(Path::new(image_path), &template, &options) {
        Ok(results) if json => match format_json(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(1);
            }
        },
        Ok(results) => print!("{}", format_text(&results, with_scores)),
        Err(InterpretError::EmptyTemplate) => {
            log::warn!("template {} declares no marks", template_path);
            eprintln!("Warning: template declares no marks, nothing to do");
            exit(EXIT_NO_WORK);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(arg!(-t --template <PATH> "Path to template.json file").required(true))
        .arg(arg!(-c --calibration <PATH> "Path to a calibration JSON file"))
        .arg(arg!(-d --debug "Write debug images next to the input image"))
        .arg(arg!(-s --scores "Include the ink score of each mark"))
        .arg(arg!(--json "Print results as JSON"))
        .arg(arg!(image_path: <IMAGE> "Path to the scanned form image").required(true))
}
