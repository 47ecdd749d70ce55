//! Fixture corpus for the accuracy run.
//!
//! Twenty notes over disjoint domains (finance, science, medicine, real
//! estate, sports, recipes, travel, hardware, space, agriculture, dining)
//! and forty questions answerable from exactly those notes. Numeric
//! magnitudes differ per domain so lenient substring matching stays safe;
//! `ragacc corpus --validate` lists accepted forms shared by several notes.

use ragacc_core::{Note, TestCase};

pub const NOTES: &[(&str, &str)] = &[
    (
        "TechCorp Q3 2024 Earnings",
        "TechCorp reported revenue of $847 million in Q3 2024. Net profit was $123 million. \
         The company has 4,521 employees. CEO is Marcus Chen. Stock price closed at $156.78.",
    ),
    (
        "Fusion Reactor Project Alpha",
        "Project Alpha achieved plasma temperature of 150 million degrees Celsius. The reactor \
         uses 47 superconducting magnets. Lead scientist is Dr. Sarah Kim. Funding is $2.3 \
         billion over 8 years.",
    ),
    (
        "Drug Trial XR-7 Results",
        "XR-7 showed 73% efficacy in treating migraines. Trial included 1,247 participants. \
         Side effects occurred in 12% of patients. Developed by Neurova Pharmaceuticals.",
    ),
    (
        "Manhattan Office Building Sale",
        "The Chrysler Annex sold for $312 million. Building has 42 floors and 890,000 square \
         feet. Buyer is Blackrock Real Estate. Built in 1987.",
    ),
    (
        "Lakers 2024 Season Stats",
        "Lakers finished with 52 wins and 30 losses. LeBron averaged 25.7 points per game. \
         Team payroll was $189 million.",
    ),
    (
        "Grandmother's Beef Stew Recipe",
        "Use 2.5 pounds of chuck roast. Add 6 medium potatoes, 4 carrots. Simmer for 3.5 hours \
         at 325 degrees. Serves 8 people.",
    ),
    (
        "Tokyo Trip Planning",
        "Flight JL007 departs LAX at 1:35 PM. Hotel Okura costs $425 per night. Total trip \
         budget is $8,500.",
    ),
    (
        "2024 Investment Portfolio Review",
        "Portfolio value is $1.45 million. Apple stock position is 850 shares. Annual return \
         was 18.7%.",
    ),
    (
        "Aurora X1 Drone Specifications",
        "Aurora X1 has 45 minute flight time. Maximum speed is 72 mph. Price is $1,299.",
    ),
    (
        "Board Meeting December 2024",
        "Board approved $15 million expansion budget. New factory in Austin, Texas. Hiring 340 \
         new employees.",
    ),
    (
        "Apollo 11 Mission Details",
        "Apollo 11 launched July 16, 1969. Neil Armstrong was commander. Moon walk lasted 2 \
         hours 31 minutes.",
    ),
    (
        "Arctic Research Station Data",
        "Station Polar-7 recorded -67 degrees Fahrenheit in January. 127 polar bear sightings \
         this year. Research team of 23 scientists.",
    ),
    (
        "Album Sales Report 2024",
        "Taylor Swift's album sold 3.4 million copies in first week. Spotify had 615 million \
         monthly users.",
    ),
    (
        "Stanford CS Program Stats",
        "Stanford CS accepts 4.7% of applicants. Starting salary for graduates averages \
         $142,000.",
    ),
    (
        "Electric Vehicle Comparison",
        "Tesla Model 3 has 358 mile range. Ford F-150 Lightning charges to 80% in 41 minutes.",
    ),
    (
        "Crypto Market Analysis Q4",
        "Bitcoin reached $73,750 all-time high. Total crypto market cap $2.8 trillion.",
    ),
    (
        "Hospital Performance Metrics",
        "Memorial Hospital has 847 beds. Average wait time ER is 47 minutes. Annual surgeries: \
         12,450.",
    ),
    (
        "SpaceX Starship Updates",
        "Starship height is 397 feet. First stage has 33 Raptor engines. Payload capacity to \
         LEO is 150 tons.",
    ),
    (
        "Farm Yield Report 2024",
        "Corn yield was 178 bushels per acre. Soybean prices at $12.45 per bushel. Farm covers \
         2,340 acres.",
    ),
    (
        "Michelin Restaurant Visit",
        "Le Bernardin has 3 Michelin stars. Tasting menu is $225 per person. Chef Eric Ripert \
         since 1994.",
    ),
];

/// Question with accepted answer forms, any of which counts as correct.
pub struct Question {
    pub prompt: &'static str,
    pub accepted: &'static [&'static str],
}

pub const QUESTIONS: &[Question] = &[
    Question {
        prompt: "What was TechCorp's revenue in Q3 2024?",
        accepted: &["847 million", "847"],
    },
    Question {
        prompt: "How many employees does TechCorp have?",
        accepted: &["4,521", "4521"],
    },
    Question {
        prompt: "Who is the CEO of TechCorp?",
        accepted: &["Marcus Chen"],
    },
    Question {
        prompt: "What temperature did Project Alpha achieve?",
        accepted: &["150 million"],
    },
    Question {
        prompt: "How many magnets does the fusion reactor use?",
        accepted: &["47"],
    },
    Question {
        prompt: "Who is the lead scientist on Project Alpha?",
        accepted: &["Sarah Kim"],
    },
    Question {
        prompt: "What is the efficacy rate of XR-7?",
        accepted: &["73%", "73 percent", "73"],
    },
    Question {
        prompt: "How many participants were in the XR-7 trial?",
        accepted: &["1,247", "1247"],
    },
    Question {
        prompt: "Who developed XR-7?",
        accepted: &["Neurova"],
    },
    Question {
        prompt: "How much did the Chrysler Annex sell for?",
        accepted: &["312 million", "312"],
    },
    Question {
        prompt: "How many floors does the Chrysler Annex have?",
        accepted: &["42"],
    },
    Question {
        prompt: "What year was the Chrysler Annex built?",
        accepted: &["1987"],
    },
    Question {
        prompt: "How many wins did the Lakers have in 2024?",
        accepted: &["52"],
    },
    Question {
        prompt: "What was LeBron's scoring average?",
        accepted: &["25.7"],
    },
    Question {
        prompt: "How long should the beef stew simmer?",
        accepted: &["3.5 hours", "3.5"],
    },
    Question {
        prompt: "How many potatoes in grandmother's beef stew?",
        accepted: &["6"],
    },
    Question {
        prompt: "What is the flight number to Tokyo?",
        accepted: &["JL007"],
    },
    Question {
        prompt: "How much per night is Hotel Okura?",
        accepted: &["425", "$425"],
    },
    Question {
        prompt: "What is the total Tokyo trip budget?",
        accepted: &["8,500", "8500"],
    },
    Question {
        prompt: "What is the portfolio value?",
        accepted: &["1.45 million", "1.45"],
    },
    Question {
        prompt: "How many Apple shares are in the portfolio?",
        accepted: &["850"],
    },
    Question {
        prompt: "What was the annual return on the portfolio?",
        accepted: &["18.7%", "18.7"],
    },
    Question {
        prompt: "What is the flight time of the Aurora X1?",
        accepted: &["45 minute", "45"],
    },
    Question {
        prompt: "What is the maximum speed of the Aurora X1 drone?",
        accepted: &["72 mph", "72"],
    },
    Question {
        prompt: "How much does the Aurora X1 cost?",
        accepted: &["1,299", "1299"],
    },
    Question {
        prompt: "What was the approved expansion budget?",
        accepted: &["15 million", "15"],
    },
    Question {
        prompt: "Where is the new factory opening?",
        accepted: &["Austin"],
    },
    Question {
        prompt: "How many new employees are being hired?",
        accepted: &["340"],
    },
    Question {
        prompt: "When did Apollo 11 launch?",
        accepted: &["July 16, 1969", "July 16"],
    },
    Question {
        prompt: "How long was the Apollo 11 moon walk?",
        accepted: &["2 hours 31", "2 hours"],
    },
    Question {
        prompt: "What temperature was recorded at Polar-7?",
        accepted: &["-67"],
    },
    Question {
        prompt: "How many polar bears were sighted?",
        accepted: &["127"],
    },
    Question {
        prompt: "How many copies did Taylor Swift's album sell in the first week?",
        accepted: &["3.4 million", "3.4"],
    },
    Question {
        prompt: "How many monthly users does Spotify have?",
        accepted: &["615 million", "615"],
    },
    Question {
        prompt: "What is Stanford CS acceptance rate?",
        accepted: &["4.7%", "4.7"],
    },
    Question {
        prompt: "What is the starting salary for Stanford CS graduates?",
        accepted: &["142,000", "142000"],
    },
    Question {
        prompt: "What is the range of the Tesla Model 3?",
        accepted: &["358"],
    },
    Question {
        prompt: "How many Raptor engines does Starship have?",
        accepted: &["33"],
    },
    Question {
        prompt: "How many beds does Memorial Hospital have?",
        accepted: &["847"],
    },
    Question {
        prompt: "What is the ER wait time at Memorial Hospital?",
        accepted: &["47 minute", "47"],
    },
];

/// Canary fact for the isolation check. Absent from the main corpus.
pub const CANARY_NOTE: (&str, &str) = (
    "Vault Access Log",
    "The vault combination for the Quillfeather archive is 93-17-58.",
);
pub const CANARY_QUESTION: &str = "What is the vault combination for the Quillfeather archive?";
pub const CANARY_ANSWERS: &[&str] = &["93-17-58"];

pub fn notes() -> Vec<Note> {
    NOTES
        .iter()
        .map(|(title, text)| Note::new(*title, *text))
        .collect()
}

pub fn test_cases() -> Vec<TestCase> {
    QUESTIONS
        .iter()
        .map(|q| TestCase::new(q.prompt, q.accepted.iter().copied()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragacc_core::corpus::validate;

    #[test]
    fn test_corpus_sizes() {
        assert_eq!(NOTES.len(), 20);
        assert_eq!(QUESTIONS.len(), 40);
    }

    #[test]
    fn test_corpus_is_self_consistent() {
        let issues = validate(&notes(), &test_cases());
        assert!(issues.is_empty(), "corpus issues: {issues:?}");
    }

    #[test]
    fn test_canary_absent_from_corpus() {
        let canary = CANARY_ANSWERS[0];
        assert!(NOTES.iter().all(|(_, text)| !text.contains(canary)));
        assert!(validate(
            &[Note::new(CANARY_NOTE.0, CANARY_NOTE.1)],
            &[TestCase::new(CANARY_QUESTION, CANARY_ANSWERS.iter().copied())],
        )
        .is_empty());
    }

    #[test]
    fn test_every_note_backs_some_question() {
        let cases = test_cases();
        let lonely: Vec<_> = NOTES
            .iter()
            .filter(|(_, text)| {
                let text = text.to_lowercase();
                !cases.iter().any(|c| {
                    c.accepted_answers
                        .iter()
                        .any(|a| text.contains(&a.to_lowercase()))
                })
            })
            .map(|(title, _)| *title)
            .collect();
        // The restaurant note is a distractor with no question of its own.
        assert_eq!(lonely, vec!["Michelin Restaurant Visit"]);
    }
}
