//! Splits résumé text into section-tagged chunks of at most 1000 characters.

use crate::storage::SectionType;

const MAX_CHUNK_LEN: usize = 1000;

/// A chunk of résumé text tagged with the section it most likely belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub section_type: SectionType,
}

/// Splits `text` by paragraph breaks (`\n\n+`), labels each paragraph by
/// keyword heuristic, and further splits any paragraph longer than
/// [`MAX_CHUNK_LEN`] at sentence boundaries (`". "`), accumulating
/// sentences until the next one would exceed the cap.
pub fn chunk_resume_text(text: &str) -> Vec<Chunk> {
    let paragraph_re = regex::Regex::new(r"\n\n+").expect("valid regex");

    paragraph_re
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|paragraph| {
            let section_type = classify_paragraph(paragraph);
            split_to_cap(paragraph)
                .into_iter()
                .map(move |text| Chunk { text, section_type })
        })
        .collect()
}

fn classify_paragraph(paragraph: &str) -> SectionType {
    let lower = paragraph.to_lowercase();

    const EDUCATION: [&str; 4] = ["education", "degree", "university", "college"];
    const EXPERIENCE: [&str; 4] = ["experience", "worked", "position", "company"];
    const SKILLS: [&str; 3] = ["skill", "proficient", "expertise"];
    const CERTIFICATIONS: [&str; 2] = ["certification", "certified"];

    if EDUCATION.iter().any(|kw| lower.contains(kw)) {
        SectionType::Education
    } else if EXPERIENCE.iter().any(|kw| lower.contains(kw)) {
        SectionType::Experience
    } else if SKILLS.iter().any(|kw| lower.contains(kw)) {
        SectionType::Skills
    } else if lower.contains("project") {
        SectionType::Projects
    } else if CERTIFICATIONS.iter().any(|kw| lower.contains(kw)) {
        SectionType::Certifications
    } else {
        SectionType::General
    }
}

fn split_to_cap(paragraph: &str) -> Vec<String> {
    if paragraph.len() <= MAX_CHUNK_LEN {
        return vec![paragraph.to_string()];
    }

    let sentences: Vec<&str> = paragraph.split(". ").collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (i, sentence) in sentences.iter().enumerate() {
        let separator = if i + 1 < sentences.len() { ". " } else { "" };
        let candidate_len = current.len() + sentence.len() + separator.len();

        if !current.is_empty() && candidate_len > MAX_CHUNK_LEN {
            chunks.push(std::mem::take(&mut current));
        }

        current.push_str(sentence);
        current.push_str(separator);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_paragraph_breaks() {
        let text = "First paragraph.\n\nSecond paragraph.\n\n\nThird.";
        let chunks = chunk_resume_text(text);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn classifies_sections_by_keyword() {
        assert_eq!(
            chunk_resume_text("Bachelor of Science, State University")[0].section_type,
            SectionType::Education
        );
        assert_eq!(
            chunk_resume_text("Worked as Senior Engineer at Acme Company")[0].section_type,
            SectionType::Experience
        );
        assert_eq!(
            chunk_resume_text("Proficient in Rust and Go")[0].section_type,
            SectionType::Skills
        );
        assert_eq!(
            chunk_resume_text("Built several open source projects")[0].section_type,
            SectionType::Projects
        );
        assert_eq!(
            chunk_resume_text("AWS Certified Solutions Architect")[0].section_type,
            SectionType::Certifications
        );
        assert_eq!(
            chunk_resume_text("Enjoys hiking on weekends")[0].section_type,
            SectionType::General
        );
    }

    #[test]
    fn long_paragraph_splits_at_sentence_boundaries_under_cap() {
        let sentence = "A".repeat(200) + ". ";
        let paragraph = sentence.repeat(10);
        let chunks = chunk_resume_text(&paragraph);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 1000);
        }
    }

    #[test]
    fn short_paragraph_is_a_single_chunk() {
        let chunks = chunk_resume_text("Short résumé line.");
        assert_eq!(chunks.len(), 1);
    }
}
