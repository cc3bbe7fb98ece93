//! The `quizgrade grade` command.

use std::path::PathBuf;

use anyhow::Result;

use quizgrade_core::model::{Question, QuestionType};
use quizgrade_core::text::TextScore;
use quizgrade_delegates::config::load_config_from;

pub struct GradeArgs {
    pub question_type: String,
    pub correct: String,
    pub answer: String,
    pub threshold: Option<f64>,
    pub semantic: bool,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub fn execute(args: GradeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let threshold = args.threshold.unwrap_or(config.default_threshold);
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "threshold must be between 0.0 and 1.0"
    );
    anyhow::ensure!(
        matches!(args.format.as_str(), "text" | "json"),
        "unknown format '{}', expected text or json",
        args.format
    );

    let question_type = QuestionType::from_legacy(&args.question_type);
    let semantic = args.semantic && config.semantic_matching;
    let question = Question::text("cli", "", &args.correct)
        .with_type(question_type)
        .with_threshold(threshold)
        .with_semantic_matching(semantic);

    let engine = config.engine();
    let result = engine.grade(&question, &args.answer);

    // Only the tiered matcher reports which rule fired.
    let score: Option<TextScore> = (question_type == QuestionType::Text && semantic)
        .then(|| engine.matcher().score(&args.answer, &args.correct));

    if args.format == "json" {
        let output = serde_json::json!({
            "question_type": question_type,
            "is_correct": result.is_correct,
            "similarity": result.similarity,
            "threshold": threshold,
            "tier": score.map(|s| s.tier),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Question type: {question_type}");
        match score {
            Some(s) => println!("Similarity:    {:.2} ({:?})", result.similarity, s.tier),
            None => println!("Similarity:    {:.2}", result.similarity),
        }
        println!(
            "Result:        {}",
            if result.is_correct {
                "CORRECT"
            } else {
                "INCORRECT"
            }
        );
    }

    Ok(())
}
