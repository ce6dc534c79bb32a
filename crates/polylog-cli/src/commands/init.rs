//! The `polylog init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("polylog.toml").exists() {
        println!("polylog.toml already exists, skipping.");
    } else {
        std::fs::write("polylog.toml", SAMPLE_CONFIG)?;
        println!("Created polylog.toml");
    }

    std::fs::create_dir_all("content/en")?;
    let sample_path = Path::new("content/en/vocabulary.json");
    if sample_path.exists() {
        println!("content/en/vocabulary.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_CONTENT)?;
        println!("Created content/en/vocabulary.json");
    }

    println!("\nNext steps:");
    println!("  1. Point [evaluator] in polylog.toml at your review service");
    println!("  2. Run: polylog validate --content content");
    println!(
        "  3. Run: polylog grade --user you@example.com --module 300 --test 301 --day 1 \
         --answer 1 --answer 0"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# polylog configuration

data_dir = "./polylog-data"
content_dir = "./content"
parallelism = 4

# Offline reviewer that scores by similarity. Replace with:
#   type = "http"
#   base_url = "https://review.example.com"
#   api_key = "${POLYLOG_API_KEY}"
[evaluator]
type = "mock"

[analytics]
total_tests_goal = 100
completed_tests_goal = 80
average_score_goal = 85
study_days_goal = 30
improvement_goal = 10

[analytics.module_labels]
100 = "Speaking"
200 = "Translation"
300 = "Vocabulary"
700 = "Listening"
"#;

const SAMPLE_CONTENT: &str = r#"{
  "language": "en",
  "module_id": "300",
  "test_id": "301",
  "mode": "review",
  "content": {
    "1": [
      {
        "id": "v1",
        "word": "apple",
        "prompt": "Which word means 사과?",
        "options": ["pear", "apple", "grape"],
        "correct_option": 1
      },
      {
        "id": "v2",
        "word": "book",
        "prompt": "Which word means 책?",
        "options": ["book", "desk", "chair"],
        "correct_option": 0
      }
    ]
  }
}
"#;
