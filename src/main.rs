mod event;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qwhizz::app::{AppState, LoadIssue, Page, Persisted};
use qwhizz::config::{Config, clamp_question_count};
use qwhizz::error::{QuizError, QuizResult};
use qwhizz::generator::{Difficulty, QuestionBody, QuestionSpec, Topic, Triangle};
use qwhizz::session::quiz::{ExitOutcome, QuizSession, ReviewStep, SessionState, SubmitOutcome};
use qwhizz::store::json_store::RejectPolicy;
use qwhizz::store::schema::HistoryLimit;
use qwhizz::store::score_store::DeleteSelector;

use event::{EventHandler, InputEvent};

#[derive(Parser)]
#[command(name = "qwhizz", version, about = "Algebra and trigonometry quiz")]
struct Cli {
    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    verbose: bool,

    #[arg(
        long,
        global = true,
        help = "Leave a scoreboard with invalid entries untouched and run in temporary mode"
    )]
    keep_invalid: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz
    Play {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, default_value = "easy", value_parser = parse_difficulty)]
        difficulty: Difficulty,

        /// Number of questions (5 to 35)
        #[arg(short, long)]
        questions: Option<usize>,

        /// Replace an existing score for this username and difficulty
        #[arg(long)]
        overwrite: bool,

        /// Accept spaces in the username replaced by underscores
        #[arg(long)]
        underscore: bool,
    },

    /// Browse, delete, retry and review saved scores
    Scores,

    /// Show or change settings
    Settings {
        #[arg(long, value_parser = parse_switch)]
        timer: Option<bool>,

        #[arg(long, value_parser = parse_switch)]
        algebra: Option<bool>,

        #[arg(long, value_parser = parse_switch)]
        trigonometry: Option<bool>,

        /// Undo history depth: 0, 10, 25 or 50
        #[arg(long, value_parser = parse_history)]
        history: Option<HistoryLimit>,
    },
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_name(s).ok_or_else(|| format!("unknown difficulty '{s}' (easy, medium, hard)"))
}

fn parse_switch(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("expected on or off, got '{s}'")),
    }
}

fn parse_history(s: &str) -> Result<HistoryLimit, String> {
    let n: u32 = s.parse().map_err(|_| format!("expected a number, got '{s}'"))?;
    HistoryLimit::try_from(n)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "qwhizz=debug"
    } else {
        "qwhizz=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::load()?;
    let policy = if cli.keep_invalid {
        RejectPolicy::KeepFile
    } else {
        RejectPolicy::Discard
    };
    let mut app = AppState::new(config, policy);
    report_load_issues(&mut app);

    match cli.command {
        Commands::Play {
            username,
            difficulty,
            questions,
            overwrite,
            underscore,
        } => {
            let events = EventHandler::new(Duration::from_millis(app.config.tick_interval_ms));
            let count = clamp_question_count(questions.unwrap_or(app.config.default_question_count));
            play(&mut app, &events, &username, difficulty, count, overwrite, underscore)
        }
        Commands::Scores => {
            let events = EventHandler::new(Duration::from_millis(app.config.tick_interval_ms));
            scores(&mut app, &events)
        }
        Commands::Settings {
            timer,
            algebra,
            trigonometry,
            history,
        } => settings(&mut app, timer, algebra, trigonometry, history),
    }
}

fn report_load_issues(app: &mut AppState) {
    for issue in app.take_load_issues() {
        match issue {
            LoadIssue::Created(file) => eprintln!("Created {file}."),
            LoadIssue::Rejected(entries) => {
                for entry in entries {
                    eprintln!("Ignored scoreboard entry {}: {}", entry.index + 1, entry.reason);
                }
            }
            LoadIssue::Replaced { file, reason } => {
                eprintln!("{file} was unreadable ({reason}) and has been reset.")
            }
            LoadIssue::Failed(e) => eprintln!("{e}"),
        }
    }
    if app.is_temporary() {
        eprintln!("Running in temporary mode: changes will not be saved.");
    }
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}

fn confirm(events: &EventHandler, question: &str) -> Result<bool> {
    prompt(&format!("{question} [y/N] "))?;
    let answer = events.next_line().unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn report_saved(app: &AppState, result: QuizResult<usize>, what: &str) {
    match result {
        Ok(0) => println!("Nothing changed."),
        Ok(n) if app.is_temporary() => {
            println!("{n} score(s) {what} (temporary mode, not saved).")
        }
        Ok(n) => println!("{n} score(s) {what}."),
        Err(e) if e.is_storage_failure() => {
            eprintln!("Could not save the scoreboard, changes are kept until exit: {e}")
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn play(
    app: &mut AppState,
    events: &EventHandler,
    username: &str,
    difficulty: Difficulty,
    count: usize,
    overwrite: bool,
    underscore: bool,
) -> Result<()> {
    let mut confirm_overwrite = overwrite;
    let session = loop {
        match app.prepare_quiz(username, difficulty, count, confirm_overwrite, underscore) {
            Ok(session) => break session,
            Err(e @ QuizError::DuplicateScoreConflict { .. }) => {
                println!("{e}.");
                if !confirm(events, "Overwrite it?")? {
                    return Ok(());
                }
                confirm_overwrite = true;
            }
            Err(QuizError::NoTopicsSelected) => {
                println!("Both algebra and trigonometry are disabled.");
                if !confirm(events, "Enable both topics?")? {
                    return Ok(());
                }
                if let Err(e) = app.enable_all_topics() {
                    eprintln!("Could not save settings: {e}");
                }
            }
            Err(e) => return Err(e.into()),
        }
    };
    run_quiz(app, events, session)
}

fn render_triangle(triangle: &Triangle) {
    let slots = [
        ("hypotenuse", &triangle.hypotenuse),
        ("opposite", &triangle.opposite),
        ("adjacent", &triangle.adjacent),
        ("angle", &triangle.angle),
    ];
    for (label, value) in slots {
        if let Some(value) = value {
            println!("    {label:<11}{value}");
        }
    }
}

fn render_question(question: &QuestionSpec, position: usize, total: usize, choices: &[String]) {
    println!();
    println!("Question {position}/{total}: {}", question.title);
    for line in question.statement.lines() {
        println!("  {line}");
    }
    match &question.body {
        QuestionBody::Expression(expression) => println!("    {expression}"),
        QuestionBody::Triangle(triangle) => render_triangle(triangle),
    }
    for (i, choice) in choices.iter().enumerate() {
        println!("  {}) {choice}", i + 1);
    }
}

fn current_choices(app: &mut AppState, session: &QuizSession) -> Vec<String> {
    session
        .current_question()
        .map(|q| q.answer_choices(app.rng()))
        .unwrap_or_default()
}

/// Wait for a line while an active quiz redraws its timer on each tick.
fn read_quiz_line(events: &EventHandler, session: &mut QuizSession) -> Option<String> {
    loop {
        match events.next() {
            InputEvent::Line(line) => return Some(line),
            InputEvent::Closed => return None,
            InputEvent::Tick => {
                let Some(token) = session.timer().pending_tick() else {
                    continue;
                };
                if let Some(label) = session.tick(token) {
                    print!("\r[{label}] > ");
                    let _ = io::stdout().flush();
                }
            }
        }
    }
}

fn run_quiz(app: &mut AppState, events: &EventHandler, mut session: QuizSession) -> Result<()> {
    let mut choices = current_choices(app, &session);
    let mut shown = None;
    loop {
        match session.state() {
            SessionState::InProgress => {
                let index = session.current_index();
                if shown != Some(index) {
                    if let Some(question) = session.current_question() {
                        render_question(question, index + 1, session.question_count(), &choices);
                    }
                    println!("  (1-4 answer, p pause, r restart, n new quiz, q quit)");
                    shown = Some(index);
                }
                if session.timer().display_enabled() {
                    prompt(&format!("[{}] > ", session.timer().display()))?;
                } else {
                    prompt("> ")?;
                }
            }
            SessionState::Completed => {
                prompt("r retry, n new quiz, q back to menu > ")?;
            }
            _ => {
                app.leave_quiz(Page::Home);
                return Ok(());
            }
        }

        let Some(line) = read_quiz_line(events, &mut session) else {
            session.exit(true)?;
            app.leave_quiz(Page::Home);
            return Ok(());
        };
        let command = line.trim().to_ascii_lowercase();

        match (session.state(), command.as_str()) {
            (SessionState::InProgress, "1" | "2" | "3" | "4") => {
                let pick = command.parse::<usize>().unwrap_or(1) - 1;
                let Some(answer) = choices.get(pick).cloned() else {
                    continue;
                };
                match session.submit_answer(&answer)? {
                    SubmitOutcome::Next { .. } => choices = current_choices(app, &session),
                    SubmitOutcome::Completed(completion) => {
                        println!();
                        println!(
                            "Finished! Score {}  Time {}",
                            completion.record.score, completion.record.elapsed
                        );
                        match app.finish_quiz(completion) {
                            Ok(saved) if saved.persisted == Persisted::MemoryOnly => println!(
                                "Temporary mode: score #{} is kept until exit but not saved.",
                                saved.ref_number
                            ),
                            Ok(saved) => println!("Saved as #{}.", saved.ref_number),
                            Err(e) => eprintln!("Could not save your score: {e}"),
                        }
                    }
                }
            }
            (SessionState::InProgress, "p") => {
                session.pause()?;
                println!("Paused. Press Enter to resume.");
                if events.next_line().is_none() {
                    session.exit(true)?;
                    app.leave_quiz(Page::Home);
                    return Ok(());
                }
                session.resume()?;
                shown = None;
            }
            (SessionState::InProgress | SessionState::Completed, "r") => {
                let topics = app.settings().topics();
                session.restart(false, topics, app.rng())?;
                choices = current_choices(app, &session);
                shown = None;
            }
            (SessionState::InProgress | SessionState::Completed, "n") => {
                match app.new_quiz(&mut session) {
                    Ok(_) => {
                        choices = current_choices(app, &session);
                        shown = None;
                    }
                    Err(e) => println!("{e}."),
                }
            }
            (_, "q") => {
                if session.exit(false)? == ExitOutcome::NeedsConfirmation {
                    if !confirm(events, "Progress will be lost. Quit?")? {
                        shown = None;
                        continue;
                    }
                    session.exit(true)?;
                }
                app.leave_quiz(Page::Home);
                return Ok(());
            }
            _ => {}
        }
    }
}

fn run_review(app: &mut AppState, events: &EventHandler, mut session: QuizSession) -> Result<()> {
    let total = session.question_count();
    loop {
        if let Some(answer) = session.reviewed_answer() {
            let choices = answer.question.answer_choices(app.rng());
            render_question(&answer.question, session.current_index() + 1, total, &choices);
            let mark = if answer.is_correct() { "correct" } else { "wrong" };
            println!("  Your answer: {} ({mark})", answer.user_answer);
            println!("  Correct answer: {}", answer.question.correct_answer);
        }
        prompt("n next, p previous, q quit > ")?;
        let Some(line) = events.next_line() else {
            break;
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "p" => {
                session.previous()?;
            }
            "q" => {
                session.exit(false)?;
                break;
            }
            _ => {
                if session.next()? == ReviewStep::Finished {
                    break;
                }
            }
        }
    }
    app.leave_quiz(Page::Scoreboard);
    Ok(())
}

fn print_scoreboard(app: &AppState) {
    let store = app.store();
    if store.is_empty() {
        println!("No scores yet.");
    } else {
        println!(
            "{:<6} {:<20} {:<7} {:>9} {:>9} {:>6}",
            "Ref", "Username", "Level", "Questions", "Time", "Score"
        );
        for record in store.list() {
            let [ref_number, username, difficulty, questions, time, score] = record.summary_row();
            println!(
                "{ref_number:<6} {username:<20} {difficulty:<7} {questions:>9} {time:>9} {score:>6}"
            );
        }
    }
    if app.is_temporary() {
        println!("(temporary mode: changes are not saved)");
    }
}

fn parse_ref(word: &str) -> Option<u32> {
    let parsed = word.trim_start_matches('#').parse().ok();
    if parsed.is_none() {
        println!("'{word}' is not a reference number.");
    }
    parsed
}

fn scores(app: &mut AppState, events: &EventHandler) -> Result<()> {
    app.page = Page::Scoreboard;
    print_scoreboard(app);
    loop {
        if app.reload_if_temporary() {
            println!("Data files reloaded.");
            report_load_issues(app);
            print_scoreboard(app);
        }
        prompt("scores> ")?;
        let Some(line) = events.next_line() else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["list"] => print_scoreboard(app),
            ["delete", "all"] => {
                let result = app.delete_scores(&DeleteSelector::All);
                report_saved(app, result, "deleted")
            },
            ["delete", refs @ ..] if !refs.is_empty() => {
                let parsed: Option<Vec<u32>> = refs.iter().map(|w| parse_ref(w)).collect();
                if let Some(refs) = parsed {
                    let result = app.delete_scores(&DeleteSelector::refs(refs));
                    report_saved(app, result, "deleted");
                }
            }
            ["undo"] => {
                let result = app.undo_delete();
                report_saved(app, result, "restored")
            }
            ["redo"] => {
                let result = app.redo_delete();
                report_saved(app, result, "deleted")
            }
            ["retry", word] => {
                if let Some(ref_number) = parse_ref(word) {
                    match app.retry(ref_number)? {
                        Some(session) => run_quiz(app, events, session)?,
                        None => println!("No score #{ref_number}."),
                    }
                    app.page = Page::Scoreboard;
                }
            }
            ["review", word] => {
                if let Some(ref_number) = parse_ref(word) {
                    match app.review(ref_number) {
                        Some(session) => run_review(app, events, session)?,
                        None => println!("No score #{ref_number}."),
                    }
                }
            }
            ["quit" | "q"] => break,
            _ => println!(
                "Commands: list, delete all, delete <ref>..., undo, redo, retry <ref>, review <ref>, quit"
            ),
        }
    }
    app.page = Page::Home;
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn settings(
    app: &mut AppState,
    timer: Option<bool>,
    algebra: Option<bool>,
    trigonometry: Option<bool>,
    history: Option<HistoryLimit>,
) -> Result<()> {
    if let Some(enabled) = timer {
        app.set_timer_enabled(enabled)?;
    }
    if let Some(enabled) = algebra {
        app.set_topic_enabled(Topic::Algebra, enabled)?;
    }
    if let Some(enabled) = trigonometry {
        app.set_topic_enabled(Topic::Trigonometry, enabled)?;
    }
    if let Some(limit) = history {
        app.set_history_limit(limit)?;
    }

    let s = app.settings();
    println!("timer          {}", on_off(s.enable_timer));
    println!("algebra        {}", on_off(s.enable_algebra));
    println!("trigonometry   {}", on_off(s.enable_trigonometry));
    println!("undo history   {}", s.deletion_history_states.depth());
    if app.is_temporary() {
        println!("(temporary mode: settings are not saved)");
    }
    Ok(())
}
