//! The `quizgrade init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizgrade.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("questions")?;
    write_if_missing(Path::new("questions/example.toml"), EXAMPLE_BANK)?;

    std::fs::create_dir_all("submissions")?;
    write_if_missing(Path::new("submissions/example.toml"), EXAMPLE_SUBMISSIONS)?;

    println!("\nNext steps:");
    println!("  1. Edit quizgrade.toml (threshold, delegate, translations)");
    println!("  2. Run: quizgrade validate --bank questions/example.toml");
    println!(
        "  3. Run: quizgrade batch --bank questions/example.toml --submissions submissions/example.toml"
    );

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizgrade configuration

default_threshold = 0.7
semantic_matching = true
parallelism = 4
delegate_timeout_ms = 3000
output_dir = "./quizgrade-results"

# Optional remote similarity service. Without it, text answers are
# graded by the built-in matcher.
# [delegate]
# type = "http"
# base_url = "http://localhost:8080"
# api_key = "${QUIZGRADE_DELEGATE_KEY}"

# Extra city-name translations, merged into the built-in table.
# Set replace_default_translations = true to use only these.
[translations]
reykjavik = ["reykjavík", "reikiavik"]
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Quiz"
description = "One question of each type"

[[questions]]
id = "capital-sweden"
text = "What is the capital of Sweden?"
correct_answer = "Stockholm"

[[questions]]
id = "capital-france"
text = "Describe the capital of France."
correct_answer = "The capital of France is Paris, a large city on the Seine"
similarity_threshold = 0.8

[[questions]]
id = "largest-planet"
text = "Which planet is the largest?"
question_type = "multipleChoice"
correct_answer = "Jupiter"
options = ["Mars", "Jupiter", "Venus"]

[[questions]]
id = "nordic-capitals"
text = "Which of these are Nordic capitals?"
question_type = "checkbox"
correct_answer = "Oslo,Helsinki"
options = ["Oslo", "Helsinki", "Berlin"]

[[questions]]
id = "difficulty"
text = "How difficult was this quiz?"
question_type = "rating"
correct_answer = "3"
rating_min = 1
rating_max = 5

[[questions]]
id = "travel-habits"
text = "How often do you visit each city?"
question_type = "grid"
correct_answer = ""
grid_rows = ["Oslo", "Helsinki"]
grid_columns = ["Never", "Sometimes", "Often"]
"#;

const EXAMPLE_SUBMISSIONS: &str = r#"[[submissions]]
question_id = "capital-sweden"
student = "alice"
answer = "Stokholm"

[[submissions]]
question_id = "capital-sweden"
student = "bob"
answer = "Oslo"

[[submissions]]
question_id = "capital-france"
student = "alice"
answer = "Paris"

[[submissions]]
question_id = "largest-planet"
student = "alice"
answer = "Jupiter"

[[submissions]]
question_id = "nordic-capitals"
student = "bob"
answer = "Helsinki, Oslo"

[[submissions]]
question_id = "difficulty"
student = "bob"
answer = "4"

[[submissions]]
question_id = "travel-habits"
student = "alice"
answer = "Oslo:Often,Helsinki:Never"
"#;
