//! Job specification — the immutable job-side input to matching and scoring.
//!
//! Built once per request from the role string and optional description:
//! stop-worded keyword frequencies, role-based skill expansion, a synonym
//! table for discounted semantic matches, and parsed requirements (minimum
//! years, minimum degree). The SHA-256 content hash keys the AI response
//! cache so repeated job descriptions never repeat an AI call.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::AppError;
use crate::parsing::builder::{contains_term, KNOWN_SKILL_TERMS};

/// Degree levels ordered by rank for meets/exceeds comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl DegreeLevel {
    pub fn rank(&self) -> u8 {
        match self {
            DegreeLevel::HighSchool => 1,
            DegreeLevel::Associate => 2,
            DegreeLevel::Bachelor => 3,
            DegreeLevel::Master => 4,
            DegreeLevel::Doctorate => 5,
        }
    }

    /// Detects the highest degree level named in a text. Matches are
    /// boundary-aware so "systems" never reads as "ms".
    pub fn detect(text: &str) -> Option<DegreeLevel> {
        let lowered = text.to_lowercase();
        let table: &[(&[&str], DegreeLevel)] = &[
            (
                &["phd", "ph.d", "doctorate", "doctoral"],
                DegreeLevel::Doctorate,
            ),
            (
                &["master", "masters", "m.tech", "m.sc", "msc", "mba", "m.s", "ms"],
                DegreeLevel::Master,
            ),
            (
                &[
                    "bachelor",
                    "bachelors",
                    "b.tech",
                    "b.sc",
                    "bsc",
                    "b.s",
                    "bs",
                    "b.e",
                    "undergraduate",
                ],
                DegreeLevel::Bachelor,
            ),
            (
                &["associate degree", "associate's degree"],
                DegreeLevel::Associate,
            ),
            (&["high school", "secondary school"], DegreeLevel::HighSchool),
        ];
        for (keywords, level) in table {
            if keywords.iter().any(|k| contains_term(&lowered, k)) {
                return Some(*level);
            }
        }
        None
    }
}

/// One job-side keyword with its description frequency and synonym variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobKeyword {
    pub term: String,
    pub frequency: u32,
    pub synonyms: Vec<String>,
    /// Whether the expansion vocabulary recognizes this term. The fraction
    /// of unknown terms drives the dispatch policy's niche-vocabulary check.
    pub known: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpecification {
    pub role: String,
    pub description: Option<String>,
    /// Description-derived keywords (falls back to the role table when no
    /// description was supplied). Drives the keyword component.
    pub keywords: Vec<JobKeyword>,
    /// Skills expected for the role regardless of description wording.
    /// Drives the skills-relevance component.
    pub expected_skills: Vec<String>,
    pub required_years: Option<f64>,
    pub required_degree: Option<DegreeLevel>,
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "been", "have", "has", "had", "do", "does",
    "did", "will", "would", "should", "could", "may", "might", "must", "can", "this", "that",
    "these", "those", "you", "your", "our", "their", "they", "them", "about", "into", "over",
    "more", "than", "such", "also", "able", "work", "team", "role", "job", "who", "what",
    "when", "where", "which", "while", "other", "both", "each", "well", "years", "year",
    "experience", "required", "preferred", "strong", "skills", "including", "using",
];

const MAX_KEYWORDS: usize = 20;

/// Role-based skill expansion, used when the description is thin or absent.
const ROLE_SKILLS: &[(&str, &[&str])] = &[
    (
        "software engineer",
        &["python", "java", "javascript", "git", "sql", "api", "testing", "agile"],
    ),
    (
        "data scientist",
        &["python", "machine learning", "sql", "statistics", "pandas", "numpy", "tensorflow"],
    ),
    (
        "frontend developer",
        &["react", "javascript", "html", "css", "typescript", "angular"],
    ),
    (
        "backend developer",
        &["python", "java", "node.js", "sql", "api", "docker", "microservices", "rest"],
    ),
    (
        "full stack developer",
        &["react", "node.js", "javascript", "sql", "api", "git", "docker", "rest"],
    ),
    (
        "devops engineer",
        &["docker", "kubernetes", "ci/cd", "aws", "linux", "terraform", "jenkins", "ansible"],
    ),
    (
        "data engineer",
        &["python", "sql", "spark", "kafka", "etl", "aws", "airflow", "hadoop"],
    ),
    (
        "ml engineer",
        &["python", "tensorflow", "pytorch", "machine learning", "deep learning", "docker"],
    ),
    (
        "product manager",
        &["agile", "scrum", "roadmap", "stakeholder", "analytics", "jira", "sql"],
    ),
    (
        "qa engineer",
        &["testing", "automation", "selenium", "api testing", "ci/cd"],
    ),
];

/// Synonym variants credited at a fixed fraction of an exact match.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("javascript", &["js", "ecmascript"]),
    ("typescript", &["ts"]),
    ("kubernetes", &["k8s"]),
    ("machine learning", &["ml"]),
    ("deep learning", &["neural networks"]),
    ("postgresql", &["postgres"]),
    ("aws", &["amazon web services"]),
    ("gcp", &["google cloud"]),
    ("ci/cd", &["continuous integration", "continuous delivery"]),
    ("api", &["apis", "rest api", "web services"]),
    ("microservices", &["micro-services", "service oriented"]),
    ("docker", &["containers", "containerization"]),
    ("sql", &["structured query language"]),
    ("python", &["python3"]),
    ("node.js", &["nodejs", "node"]),
    ("scalable", &["scalability", "scaling"]),
    ("latency", &["response time"]),
];

impl JobSpecification {
    /// Builds the spec from caller input. Fails only when both the role and
    /// the description are empty — that request cannot be scored at all.
    pub fn build(role: &str, description: Option<&str>) -> Result<Self, AppError> {
        let role = role.trim().to_string();
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        if role.is_empty() && description.is_none() {
            return Err(AppError::Validation(
                "job role and description are both empty".to_string(),
            ));
        }

        let word = Regex::new(r"[a-z][a-z0-9+#./-]*").expect("keyword regex");

        let mut keywords: Vec<JobKeyword> = Vec::new();
        if let Some(desc) = &description {
            let lowered = desc.to_lowercase();

            // Multi-word technical terms first so "machine learning" does
            // not degrade to two generic tokens.
            for term in KNOWN_SKILL_TERMS.iter().filter(|t| t.contains(' ')) {
                let frequency = count_term(&lowered, term);
                if frequency > 0 {
                    push_keyword(&mut keywords, term, frequency);
                }
            }

            let mut counts: Vec<(String, u32)> = Vec::new();
            for m in word.find_iter(&lowered) {
                let token = m.as_str().trim_matches(|c| c == '.' || c == '/' || c == '-');
                if token.len() <= 3 && !is_known_term(token) {
                    continue;
                }
                if STOP_WORDS.contains(&token) {
                    continue;
                }
                match counts.iter_mut().find(|(t, _)| t == token) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((token.to_string(), 1)),
                }
            }
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            for (token, frequency) in counts {
                if keywords.len() >= MAX_KEYWORDS {
                    break;
                }
                // Keep frequent words and any recognized technical term.
                if frequency > 1 || is_known_term(&token) {
                    push_keyword(&mut keywords, &token, frequency);
                }
            }
        }

        // Role table: what the skills component expects regardless of how
        // the description is worded. Falls back to skill-like description
        // keywords for roles outside the table.
        let mut expected_skills: Vec<String> = role_skills(&role.to_lowercase())
            .iter()
            .map(|s| s.to_string())
            .collect();
        if expected_skills.is_empty() {
            expected_skills = keywords
                .iter()
                .filter(|k| k.known)
                .map(|k| k.term.clone())
                .collect();
        }

        // Without a description the keyword component still needs terms to
        // match against; the role's expected skills stand in.
        if keywords.is_empty() {
            for skill in &expected_skills {
                push_keyword(&mut keywords, skill, 1);
            }
        }

        let required_years = description.as_deref().and_then(parse_required_years);
        let required_degree = description.as_deref().and_then(DegreeLevel::detect);

        Ok(Self {
            role,
            description,
            keywords,
            expected_skills,
            required_years,
            required_degree,
        })
    }

    /// SHA-256 hex over role and description. Deliberately excludes the
    /// resume: the cache is per job spec, not per resume/job pair.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.role.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.description.as_deref().unwrap_or("").as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Fraction of keywords the expansion vocabulary does not recognize.
    pub fn unknown_fraction(&self) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let unknown = self.keywords.iter().filter(|k| !k.known).count();
        unknown as f64 / self.keywords.len() as f64
    }

    /// Keywords the vocabulary recognizes as skills, for the skills and
    /// experience tech-overlap components.
    pub fn skill_keywords(&self) -> Vec<&JobKeyword> {
        self.keywords.iter().filter(|k| k.known).collect()
    }
}

fn push_keyword(keywords: &mut Vec<JobKeyword>, term: &str, frequency: u32) {
    if keywords.iter().any(|k| k.term == term) {
        return;
    }
    keywords.push(JobKeyword {
        term: term.to_string(),
        frequency,
        synonyms: synonyms_for(term),
        known: is_known_term(term),
    });
}

fn is_known_term(term: &str) -> bool {
    KNOWN_SKILL_TERMS.contains(&term)
        || ROLE_SKILLS
            .iter()
            .any(|(_, skills)| skills.contains(&term))
        || SYNONYMS.iter().any(|(t, _)| *t == term)
}

fn synonyms_for(term: &str) -> Vec<String> {
    SYNONYMS
        .iter()
        .find(|(t, _)| *t == term)
        .map(|(_, syns)| syns.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn role_skills(role_lower: &str) -> &'static [&'static str] {
    for (name, skills) in ROLE_SKILLS {
        if role_lower == *name {
            return skills;
        }
    }
    for (name, skills) in ROLE_SKILLS {
        if !role_lower.is_empty() && (role_lower.contains(name) || name.contains(role_lower)) {
            return skills;
        }
    }
    &[]
}

fn count_term(haystack_lower: &str, term: &str) -> u32 {
    let mut count = 0;
    let mut rest = haystack_lower;
    while contains_term(rest, term) {
        count += 1;
        if let Some(pos) = rest.find(&term.to_lowercase()) {
            rest = &rest[pos + term.len()..];
        } else {
            break;
        }
    }
    count
}

fn parse_required_years(description: &str) -> Option<f64> {
    let re = Regex::new(r"(?i)(\d{1,2})(?:\s*\+)?\s*(?:years?|yrs?)").expect("years regex");
    re.captures(&description.to_lowercase())
        .and_then(|c| c[1].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_role_and_description_is_invalid() {
        let err = JobSpecification::build("", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = JobSpecification::build("  ", Some("   ")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_role_only_expands_skills() {
        let spec = JobSpecification::build("DevOps Engineer", None).unwrap();
        let terms: Vec<&str> = spec.keywords.iter().map(|k| k.term.as_str()).collect();
        assert!(terms.contains(&"docker"));
        assert!(terms.contains(&"kubernetes"));
        assert!(spec.keywords.iter().all(|k| k.known));
    }

    #[test]
    fn test_description_keywords_carry_frequency() {
        let desc = "We need Python. Python services at scale. Also python tooling and sql.";
        let spec = JobSpecification::build("Backend Developer", Some(desc)).unwrap();

        let python = spec.keywords.iter().find(|k| k.term == "python").unwrap();
        assert_eq!(python.frequency, 3);
        assert!(spec.keywords.iter().any(|k| k.term == "sql"));
    }

    #[test]
    fn test_stop_words_are_dropped() {
        let desc = "The team will have strong experience with the required skills";
        let spec = JobSpecification::build("Engineer", Some(desc)).unwrap();
        assert!(!spec.keywords.iter().any(|k| k.term == "the"));
        assert!(!spec.keywords.iter().any(|k| k.term == "required"));
    }

    #[test]
    fn test_required_years_and_degree_parsing() {
        let desc = "Requires 5+ years of backend work and a Bachelor's degree in CS.";
        let spec = JobSpecification::build("Backend Developer", Some(desc)).unwrap();
        assert_eq!(spec.required_years, Some(5.0));
        assert_eq!(spec.required_degree, Some(DegreeLevel::Bachelor));

        let spec = JobSpecification::build("Backend Developer", Some("no requirements")).unwrap();
        assert_eq!(spec.required_years, None);
        assert_eq!(spec.required_degree, None);
    }

    #[test]
    fn test_content_hash_stability_and_sensitivity() {
        let a = JobSpecification::build("Engineer", Some("desc")).unwrap();
        let b = JobSpecification::build("Engineer", Some("desc")).unwrap();
        let c = JobSpecification::build("Engineer", Some("other")).unwrap();
        let d = JobSpecification::build("Engineerdesc", None).unwrap();

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        // The role/description separator keeps concatenations distinct.
        assert_ne!(a.content_hash(), d.content_hash());
    }

    #[test]
    fn test_unknown_fraction_flags_niche_vocabulary() {
        let desc = "Seeking quantlib quantlib verilog verilog fpga fpga specialists";
        let spec = JobSpecification::build("Hardware Wizard", Some(desc)).unwrap();
        assert!(spec.unknown_fraction() > 0.5);

        let spec = JobSpecification::build("DevOps Engineer", None).unwrap();
        assert_eq!(spec.unknown_fraction(), 0.0);
    }

    #[test]
    fn test_multiword_terms_survive() {
        let desc = "Looking for machine learning and deep learning background";
        let spec = JobSpecification::build("ML Engineer", Some(desc)).unwrap();
        assert!(spec.keywords.iter().any(|k| k.term == "machine learning"));
    }

    #[test]
    fn test_degree_detection_levels() {
        assert_eq!(DegreeLevel::detect("PhD in Physics"), Some(DegreeLevel::Doctorate));
        assert_eq!(
            DegreeLevel::detect("Master of Science"),
            Some(DegreeLevel::Master)
        );
        assert_eq!(
            DegreeLevel::detect("B.Tech Computer Science"),
            Some(DegreeLevel::Bachelor)
        );
        assert_eq!(DegreeLevel::detect("no degree here"), None);
        assert!(DegreeLevel::Master.rank() > DegreeLevel::Bachelor.rank());
    }
}
