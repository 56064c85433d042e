//! The `elevenplus init` command.

use std::path::Path;

use anyhow::{Context, Result};

use elevenplus_core::config::LOCAL_CONFIG_FILE;
use elevenplus_core::model::Subject;

pub fn execute() -> Result<()> {
    if Path::new(LOCAL_CONFIG_FILE).exists() {
        println!("{LOCAL_CONFIG_FILE} already exists, skipping.");
    } else {
        std::fs::write(LOCAL_CONFIG_FILE, SAMPLE_CONFIG)
            .with_context(|| format!("failed to write {LOCAL_CONFIG_FILE}"))?;
        println!("Created {LOCAL_CONFIG_FILE}");
    }

    std::fs::create_dir_all("data").context("failed to create data directory")?;
    for subject in Subject::ALL {
        let path = Path::new("data").join(subject.data_file());
        if path.exists() {
            println!("{} already exists, skipping.", path.display());
            continue;
        }
        std::fs::write(&path, sample_bank(subject))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }

    println!("\nNext steps:");
    println!("  1. Run: elevenplus validate");
    println!("  2. Run: elevenplus subjects");
    println!("  3. Run: elevenplus start maths test1 --timed");

    Ok(())
}

fn sample_bank(subject: Subject) -> &'static str {
    match subject {
        Subject::Maths => MATHS,
        Subject::English => ENGLISH,
        Subject::VerbalReasoning => VERBAL_REASONING,
        Subject::NonVerbalReasoning => NON_VERBAL_REASONING,
        Subject::VerbalSkills => VERBAL_SKILLS,
    }
}

const SAMPLE_CONFIG: &str = r#"# elevenplus configuration

data_dir = "./data"
storage_dir = "./.elevenplus"
history_cap = 100

# At most one pick per group on "choose one from each list" questions.
option_groups = [["A", "B", "C", "D", "E"], ["X", "Y", "Z"]]

# Minutes for a full-length test; sampled tests get a proportional share.
# Set a subject to 0 to turn its timer off.
[timer.base_minutes]
maths = 50
english = 50
verbal-reasoning = 60
non-verbal-reasoning = 40
# verbal-skills = 30
"#;

const MATHS: &str = r#"{
  "test1": {
    "title": "Maths Practice Test 1",
    "questions": [
      {
        "id": 1,
        "question": "What is 7 x 8?",
        "options": [
          {"letter": "A", "text": "54"},
          {"letter": "B", "text": "56"},
          {"letter": "C", "text": "64"},
          {"letter": "D", "text": "48"}
        ],
        "correctAnswer": "B",
        "category": "Multiplication"
      },
      {
        "id": 2,
        "question": "Which two of these numbers are prime?",
        "options": [
          {"letter": "A", "text": "2"},
          {"letter": "B", "text": "4"},
          {"letter": "C", "text": "7"},
          {"letter": "D", "text": "9"}
        ],
        "correctAnswer": "A,C",
        "category": "Number"
      },
      {
        "id": 3,
        "question": "What is 3/4 as a percentage?",
        "options": [
          {"letter": "A", "text": "34%"},
          {"letter": "B", "text": "43%"},
          {"letter": "C", "text": "75%"},
          {"letter": "D", "text": "80%"}
        ],
        "correctAnswer": "C",
        "category": "Fractions"
      },
      {
        "id": 4,
        "instruction": "Choose one shape (A-E) and one number (X-Z).",
        "question": "Which shape has four equal sides, and how many lines of symmetry does it have?",
        "options": [
          {"letter": "A", "text": "Triangle"},
          {"letter": "B", "text": "Square"},
          {"letter": "C", "text": "Rectangle"},
          {"letter": "D", "text": "Pentagon"},
          {"letter": "E", "text": "Circle"},
          {"letter": "X", "text": "2"},
          {"letter": "Y", "text": "4"},
          {"letter": "Z", "text": "6"}
        ],
        "correctAnswers": ["B", "Y"],
        "category": "Shapes"
      },
      {
        "id": 5,
        "question": "Round 4,567 to the nearest hundred.",
        "options": [
          {"letter": "A", "text": "4,500"},
          {"letter": "B", "text": "4,600"},
          {"letter": "C", "text": "5,000"},
          {"letter": "D", "text": "4,570"}
        ],
        "correctAnswer": "B",
        "category": "Number"
      }
    ]
  },
  "test2": {
    "title": "Maths Practice Test 2",
    "questions": []
  }
}
"#;

const ENGLISH: &str = r#"{
  "test1": {
    "title": "English Practice Test 1",
    "passageTitle": "The Lighthouse",
    "passage": "Every evening, Mara climbed the hundred steps of the old lighthouse. Her grandfather had kept the lamp burning for forty years, and now the job was hers. On stormy nights the beam swept across the waves, guiding the fishing boats safely home.",
    "questions": [
      {
        "id": 1,
        "question": "Who kept the lamp burning before Mara?",
        "options": [
          {"letter": "A", "text": "Her mother"},
          {"letter": "B", "text": "Her grandfather"},
          {"letter": "C", "text": "A fisherman"},
          {"letter": "D", "text": "Nobody"}
        ],
        "correctAnswer": "B",
        "category": "Comprehension"
      },
      {
        "id": 2,
        "question": "What does the word 'guiding' suggest about the beam?",
        "options": [
          {"letter": "A", "text": "It frightened the boats"},
          {"letter": "B", "text": "It was switched off"},
          {"letter": "C", "text": "It helped the boats find their way"},
          {"letter": "D", "text": "It was very small"}
        ],
        "correctAnswer": "C",
        "category": "Comprehension"
      },
      {
        "id": 29,
        "question": "Which word is spelled correctly?",
        "options": [
          {"letter": "A", "text": "necessary"},
          {"letter": "B", "text": "neccessary"},
          {"letter": "C", "text": "necesary"},
          {"letter": "D", "text": "neccesary"}
        ],
        "correctAnswer": "A",
        "category": "Spelling"
      }
    ]
  }
}
"#;

const VERBAL_REASONING: &str = r#"{
  "test1": {
    "title": "Verbal Reasoning Practice Test 1",
    "questions": [
      {
        "id": 1,
        "instruction": "Find the letter that completes both words.",
        "question": "bea (?) ime",
        "options": [
          {"letter": "A", "text": "t"},
          {"letter": "B", "text": "m"},
          {"letter": "C", "text": "r"},
          {"letter": "D", "text": "n"}
        ],
        "correctAnswer": "A",
        "category": "Missing Letters"
      },
      {
        "id": 2,
        "instruction": "Find the next pair of letters in the series.",
        "question": "AB, CD, EF, GH, ?",
        "options": [
          {"letter": "A", "text": "HI"},
          {"letter": "B", "text": "IJ"},
          {"letter": "C", "text": "JK"},
          {"letter": "D", "text": "IK"}
        ],
        "correctAnswer": "B",
        "category": "Letter Series"
      }
    ]
  }
}
"#;

const NON_VERBAL_REASONING: &str = r#"{
  "test1": {
    "title": "Non-Verbal Reasoning Practice Test 1",
    "questions": [
      {
        "id": 1,
        "question": "Which shape completes the sequence?",
        "image": "images/nvr/test1_q1.png",
        "options": [
          {"letter": "A", "text": "Shape A"},
          {"letter": "B", "text": "Shape B"},
          {"letter": "C", "text": "Shape C"},
          {"letter": "D", "text": "Shape D"},
          {"letter": "E", "text": "Shape E"}
        ],
        "correctAnswer": "D",
        "category": "Sequences"
      },
      {
        "id": 2,
        "question": "Which shape is the odd one out?",
        "image": "images/nvr/test1_q2.png",
        "options": [
          {"letter": "A", "text": "Shape A"},
          {"letter": "B", "text": "Shape B"},
          {"letter": "C", "text": "Shape C"},
          {"letter": "D", "text": "Shape D"},
          {"letter": "E", "text": "Shape E"}
        ],
        "correctAnswer": "A",
        "category": "Odd One Out"
      }
    ]
  }
}
"#;

const VERBAL_SKILLS: &str = r#"{
  "test1": {
    "title": "Verbal Skills Practice Test 1",
    "questions": [
      {
        "id": 1,
        "question": "Which word means the same as 'rapid'?",
        "options": [
          {"letter": "A", "text": "slow"},
          {"letter": "B", "text": "quick"},
          {"letter": "C", "text": "quiet"},
          {"letter": "D", "text": "heavy"}
        ],
        "correctAnswer": "B",
        "category": "Synonyms"
      },
      {
        "id": 2,
        "question": "Which word is the opposite of 'ancient'?",
        "options": [
          {"letter": "A", "text": "old"},
          {"letter": "B", "text": "modern"},
          {"letter": "C", "text": "broken"},
          {"letter": "D", "text": "famous"}
        ],
        "correctAnswer": "B",
        "category": "Antonyms"
      }
    ]
  }
}
"#;
