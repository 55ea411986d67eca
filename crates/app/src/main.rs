use std::fmt;
use std::path::PathBuf;

use course_core::model::{
    Lesson, LessonId, ModuleId, ParseIdError, ProgressSnapshot, Quiz, QuizScore, ScoreBand,
};
use services::{AppServices, Clock, ContentService, ProgressService};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://python_learning_progress.db";
const DEFAULT_CONTENT_DIR: &str = "content";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidId(ParseIdError),
    InvalidNumber { name: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    UnknownModule(ModuleId),
    UnknownLesson { module: ModuleId, lesson: LessonId },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId(err) => write!(f, "{err}"),
            ArgsError::InvalidNumber { name, raw } => write!(f, "invalid <{name}> value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownModule(module) => write!(f, "no module {module} in this course"),
            ArgsError::UnknownLesson { module, lesson } => {
                write!(f, "module {module} has no lesson {lesson}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<ParseIdError> for ArgsError {
    fn from(err: ParseIdError) -> Self {
        ArgsError::InvalidId(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [modules]                      [options]");
    eprintln!("  cargo run -p app -- lesson   <module> <lesson> [--solution] [options]");
    eprintln!("  cargo run -p app -- quiz     <module> [--answers a,b,c] [options]");
    eprintln!("  cargo run -p app -- complete <module> <lesson>     [options]");
    eprintln!("  cargo run -p app -- attempt  <module> <score> <total> [options]");
    eprintln!("  cargo run -p app -- progress                       [options]");
    eprintln!("  cargo run -p app -- reset                          [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      default {DEFAULT_DB_URL}");
    eprintln!("  --content <dir>        default {DEFAULT_CONTENT_DIR}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_CONTENT_DIR, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Modules,
    Lesson,
    Quiz,
    Complete,
    Attempt,
    Progress,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "modules" => Some(Self::Modules),
            "lesson" => Some(Self::Lesson),
            "quiz" => Some(Self::Quiz),
            "complete" => Some(Self::Complete),
            "attempt" => Some(Self::Attempt),
            "progress" => Some(Self::Progress),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    content_dir: PathBuf,
    answers: Option<Vec<String>>,
    show_solution: bool,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut content_dir = std::env::var("COURSE_CONTENT_DIR")
            .ok()
            .map_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR), PathBuf::from);
        let mut answers = None;
        let mut show_solution = false;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--content" => {
                    content_dir = PathBuf::from(require_value(args, "--content")?);
                }
                "--answers" => {
                    let value = require_value(args, "--answers")?;
                    answers = Some(value.split(',').map(str::to_owned).collect());
                }
                "--solution" => show_solution = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            db_url,
            content_dir,
            answers,
            show_solution,
            positional,
        })
    }

    fn positional(&self, index: usize, name: &'static str) -> Result<&str, ArgsError> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or(ArgsError::MissingArgument { name })
    }

    fn module_id(&self, content: &ContentService) -> Result<ModuleId, ArgsError> {
        let module: ModuleId = self.positional(0, "module")?.parse()?;
        content
            .module(module)
            .map(|_| module)
            .ok_or(ArgsError::UnknownModule(module))
    }

    fn lesson_id(&self, content: &ContentService, module: ModuleId) -> Result<LessonId, ArgsError> {
        let lesson: LessonId = self.positional(1, "lesson")?.parse()?;
        let lesson_count = content.module(module).map_or(0, |m| m.lesson_count());
        if (1..=lesson_count).contains(&lesson.value()) {
            Ok(lesson)
        } else {
            Err(ArgsError::UnknownLesson { module, lesson })
        }
    }

    fn count(&self, index: usize, name: &'static str) -> Result<u32, ArgsError> {
        let raw = self.positional(index, name)?;
        raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
            name,
            raw: raw.to_owned(),
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────────────

async fn list_modules(content: &ContentService, progress: &ProgressService) {
    println!("{}", content.course_title());
    println!();
    for module in content.list_modules() {
        let percent = progress
            .module_progress(module.id(), module.lesson_count())
            .await;
        let quiz = match progress.quiz_progress(module.id()).await {
            Some(record) if record.completed => format!("quiz passed ({}%)", record.best_score),
            Some(record) => format!("quiz best {}%", record.best_score),
            None => "quiz not taken".to_owned(),
        };
        println!(
            "{:<48} {:>2} lessons  {:>3}%  {quiz}",
            module.display_name(),
            module.lesson_count(),
            percent
        );
    }
    println!();
    println!(
        "Overall: {}%",
        progress.overall_progress(content.total_lessons()).await
    );
}

async fn show_lesson(
    content: &ContentService,
    progress: &ProgressService,
    module: ModuleId,
    lesson: LessonId,
    show_solution: bool,
) {
    let Some(doc) = content.load_lesson(module, lesson) else {
        println!("Lesson {module}.{lesson} is not available.");
        return;
    };

    let done = if progress.is_lesson_complete(module, lesson).await {
        " [completed]"
    } else {
        ""
    };
    println!("{}{done}", doc.title);
    if !doc.estimated_time.is_empty() {
        println!("Estimated time: {}", doc.estimated_time);
    }
    for (heading, body) in lesson_sections(&doc, show_solution) {
        print_section(&heading, body);
    }
    if !show_solution && doc.solution.is_some() {
        println!();
        println!("(run again with --solution to see the worked solution)");
    }
}

/// Headed sections of a lesson in reading order. The solution is only
/// included on request.
fn lesson_sections(doc: &Lesson, show_solution: bool) -> Vec<(String, &str)> {
    let mut sections = vec![("Concept".to_owned(), doc.concept.as_str())];
    if let Some(example) = &doc.code_example {
        sections.push((format!("Example ({})", example.language), example.code.as_str()));
        sections.push(("Output".to_owned(), example.output.as_str()));
    }
    sections.push(("Syntax".to_owned(), doc.syntax_breakdown.as_str()));
    if let Some(exercise) = &doc.exercise {
        sections.push(("Exercise".to_owned(), exercise.instructions.as_str()));
        sections.push(("Starter code".to_owned(), exercise.starter_code.as_str()));
        sections.push(("Hint".to_owned(), exercise.hint.as_str()));
    }
    if let Some(solution) = doc.solution.as_ref().filter(|_| show_solution) {
        sections.push(("Solution".to_owned(), solution.code.as_str()));
        sections.push(("Why it works".to_owned(), solution.explanation.as_str()));
        sections.push(("Common mistakes".to_owned(), solution.common_mistakes.as_str()));
    }
    sections.push(("Key takeaways".to_owned(), doc.key_takeaways.as_str()));
    sections.retain(|(_, body)| !body.trim().is_empty());
    sections
}

fn print_section(heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    println!();
    println!("## {heading}");
    println!("{}", body.trim_end());
}

fn show_quiz(quiz: &Quiz) {
    println!("{}", quiz.title);
    if !quiz.description.is_empty() {
        println!("{}", quiz.description);
    }
    for (index, question) in quiz.questions.iter().enumerate() {
        println!();
        println!("{}. {}", index + 1, question.text);
        if let Some(code) = &question.code {
            println!("{code}");
        }
        for (option, text) in question.options.iter().enumerate() {
            println!("   [{option}] {text}");
        }
    }
}

async fn grade_quiz(
    progress: &ProgressService,
    module: ModuleId,
    quiz: &Quiz,
    answers: &[String],
) {
    let given: Vec<_> = quiz
        .questions
        .iter()
        .zip(answers)
        .map(|(question, raw)| {
            let raw = raw.trim();
            (!raw.is_empty()).then(|| question.read_answer(raw))
        })
        .collect();
    let score = quiz.score(&given);

    for (index, question) in quiz.questions.iter().enumerate() {
        let right = given
            .get(index)
            .and_then(Option::as_ref)
            .is_some_and(|answer| question.is_correct(answer));
        let mark = if right { "ok" } else { "wrong" };
        println!("{}. {mark}", index + 1);
        if !right && !question.explanation.is_empty() {
            println!("   {}", question.explanation);
        }
    }
    print_score(score);
    progress
        .record_quiz_attempt(module, score.correct, score.total)
        .await;
}

fn print_score(score: QuizScore) {
    let percent = score.percentage();
    println!();
    println!("Score: {}/{} ({percent}%)", score.correct, score.total);
    println!("{}", ScoreBand::from_percentage(percent).message());
}

fn print_snapshot(snapshot: &ProgressSnapshot, total_lessons: u32, overall: u8) {
    println!(
        "Lessons completed: {}/{total_lessons} ({overall}%)",
        snapshot.completed_lessons
    );
    println!("Quizzes passed:    {}", snapshot.completed_quizzes);
    if let Some(stats) = &snapshot.stats {
        println!("Started:           {}", stats.started_at.format("%Y-%m-%d %H:%M"));
        println!("Last activity:     {}", stats.last_activity.format("%Y-%m-%d %H:%M"));
    }
}

async fn execute(
    cmd: Command,
    args: &Args,
    services: &AppServices,
) -> Result<(), ArgsError> {
    let content = services.content();
    let progress = services.progress();

    match cmd {
        Command::Modules => list_modules(&content, &progress).await,
        Command::Lesson => {
            let module = args.module_id(&content)?;
            let lesson = args.lesson_id(&content, module)?;
            show_lesson(&content, &progress, module, lesson, args.show_solution).await;
        }
        Command::Quiz => {
            let module = args.module_id(&content)?;
            let Some(quiz) = content.load_quiz(module) else {
                println!("Quiz for module {module} is not available.");
                return Ok(());
            };
            match &args.answers {
                Some(answers) => grade_quiz(&progress, module, &quiz, answers).await,
                None => show_quiz(&quiz),
            }
        }
        Command::Complete => {
            let module = args.module_id(&content)?;
            let lesson = args.lesson_id(&content, module)?;
            match progress.mark_lesson_complete(module, lesson).await {
                Some(record) => println!(
                    "Completed \"{}\" ({} time(s)).",
                    content.lesson_title(module, lesson),
                    record.attempts
                ),
                None => println!("Progress could not be saved."),
            }
        }
        Command::Attempt => {
            let module = args.module_id(&content)?;
            let score = args.count(1, "score")?;
            let total = args.count(2, "total")?;
            match progress.record_quiz_attempt(module, score, total).await {
                Some(record) => {
                    print_score(QuizScore {
                        correct: record.score,
                        total: record.total_questions,
                    });
                    println!("Best: {}%, attempts: {}", record.best_score, record.attempts);
                }
                None => println!("Attempt was not recorded."),
            }
        }
        Command::Progress => {
            let total = content.total_lessons();
            let snapshot = progress.snapshot().await;
            let overall = progress.overall_progress(total).await;
            print_snapshot(&snapshot, total, overall);
        }
        Command::Reset => {
            if progress.reset_progress().await {
                println!("Progress reset.");
            } else {
                println!("Progress could not be reset.");
            }
        }
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand lists the modules.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Modules,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Modules,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    if let Err(err) = prepare_sqlite_file(&parsed.db_url) {
        tracing::warn!(db_url = %parsed.db_url, error = %err, "could not prepare database file");
    }
    let services =
        AppServices::new_sqlite(&parsed.db_url, parsed.content_dir.clone(), Clock::system()).await;

    let outcome = execute(cmd, &parsed, &services).await;
    services.close().await;
    outcome.map_err(|e| {
        eprintln!("{e}");
        e.into()
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        tracing::debug!(error = %err, "exiting with failure");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::Solution;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn memory_and_absolute_urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/progress.db".into()),
            "sqlite:///tmp/progress.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/var/lib/course.db".into()),
            "sqlite:///var/lib/course.db"
        );
    }

    #[test]
    fn relative_paths_are_anchored_to_cwd() {
        let url = normalize_sqlite_url("progress.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/progress.db"));
    }

    #[test]
    fn options_and_positionals_are_split() {
        let args = parse(&["3", "--content", "/srv/content", "--answers", "1,true,,x"]).unwrap();
        assert_eq!(args.positional, vec!["3"]);
        assert_eq!(args.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(
            args.answers.as_deref(),
            Some(&["1".to_owned(), "true".into(), String::new(), "x".into()][..])
        );
    }

    #[test]
    fn missing_and_unknown_flags_are_errors() {
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["--db", "  "]),
            Err(ArgsError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn numbers_are_validated() {
        let args = parse(&["2", "seven", "10"]).unwrap();
        assert!(matches!(
            args.count(1, "score"),
            Err(ArgsError::InvalidNumber { name: "score", .. })
        ));
        assert_eq!(args.count(2, "total").unwrap(), 10);
        assert!(matches!(
            args.count(3, "extra"),
            Err(ArgsError::MissingArgument { name: "extra" })
        ));
    }

    #[test]
    fn commands_map_from_names() {
        assert_eq!(Command::from_arg("complete"), Some(Command::Complete));
        assert_eq!(Command::from_arg("ui"), None);
    }

    fn lesson_with_solution() -> Lesson {
        Lesson {
            title: "Your First Python Program".into(),
            estimated_time: String::new(),
            concept: "Comments start with #.".into(),
            code_example: None,
            syntax_breakdown: "   ".into(),
            exercise: None,
            solution: Some(Solution {
                code: "print(\"Hello!\")".into(),
                explanation: "print writes one line.".into(),
                common_mistakes: String::new(),
            }),
            key_takeaways: "Save code in .py files.".into(),
        }
    }

    #[test]
    fn solution_is_shown_only_on_request() {
        let lesson = lesson_with_solution();
        let headings = |show| -> Vec<String> {
            lesson_sections(&lesson, show)
                .into_iter()
                .map(|(heading, _)| heading)
                .collect()
        };

        assert_eq!(headings(false), vec!["Concept", "Key takeaways"]);
        assert_eq!(
            headings(true),
            vec!["Concept", "Solution", "Why it works", "Key takeaways"]
        );
    }

    #[test]
    fn solution_flag_is_parsed() {
        assert!(parse(&["1", "2", "--solution"]).unwrap().show_solution);
        assert!(!parse(&["1", "2"]).unwrap().show_solution);
    }
}
