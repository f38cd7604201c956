use std::sync::OnceLock;

use regex::Regex;

/// Raw text of one PDF page, as produced by the document loader.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub content: String,
}

/// A titled regulation article located by its structural marker line.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub body: String,
    /// Page on which the article marker was found.
    pub page: Option<u32>,
}

/// A sub-span of an article, identified by its dotted numeric marker or
/// `"intro"` for unlabelled leading text.
#[derive(Debug, Clone)]
pub struct Section {
    pub article: String,
    pub section: String,
    pub content: String,
    pub page: Option<u32>,
}

/// Articles with less body text than this are headers without content.
const MIN_ARTICLE_BODY_CHARS: usize = 15;
/// Threshold for keeping section text and intro spans.
const MIN_SECTION_TEXT_CHARS: usize = 5;

pub const INTRO_SECTION: &str = "intro";

#[allow(clippy::expect_used)]
fn article_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"ARTICLE\s+[A-Z]\d+(?::)?[^\n]*").expect("valid article marker pattern")
    })
}

#[allow(clippy::expect_used)]
fn section_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER
        .get_or_init(|| Regex::new(r"\b[A-Z]\d+(?:\.\d+)+\b").expect("valid section marker pattern"))
}

/// Splits the concatenated page text at `ARTICLE <letter><number>` marker
/// lines.
///
/// Each marker line becomes an article title; the body runs to the next
/// marker or the end of the document. Bodies shorter than the minimum are
/// headers without content and are discarded. An empty result signals an
/// unstructured document and triggers fallback chunking.
pub fn split_into_articles(pages: &[Page]) -> Vec<Article> {
    let (buffer, page_offsets) = combine_pages(pages);

    let markers: Vec<regex::Match> = article_marker().find_iter(&buffer).collect();

    let mut articles = Vec::new();
    for (idx, marker) in markers.iter().enumerate() {
        let body_end = markers
            .get(idx + 1)
            .map_or(buffer.len(), |next| next.start());
        let body = buffer
            .get(marker.end()..body_end)
            .unwrap_or_default()
            .trim();

        if body.chars().count() < MIN_ARTICLE_BODY_CHARS {
            continue;
        }

        articles.push(Article {
            title: marker.as_str().trim().to_string(),
            body: body.to_string(),
            page: page_at_offset(&page_offsets, marker.start()),
        });
    }

    articles
}

/// Splits an article body at dotted numeric section markers (`B1.7.3`).
///
/// Markers match whole tokens only. Text before the first marker becomes an
/// `"intro"` section when long enough; marker sections below the minimum
/// length are dropped. Order of appearance is preserved.
pub fn split_into_sections(article: &Article) -> Vec<Section> {
    let markers: Vec<regex::Match> = section_marker().find_iter(&article.body).collect();

    let mut sections = Vec::new();

    let intro_end = markers
        .first()
        .map_or(article.body.len(), |first| first.start());
    let intro = article.body.get(..intro_end).unwrap_or_default().trim();
    if intro.chars().count() > MIN_SECTION_TEXT_CHARS {
        sections.push(Section {
            article: article.title.clone(),
            section: INTRO_SECTION.to_string(),
            content: intro.to_string(),
            page: article.page,
        });
    }

    for (idx, marker) in markers.iter().enumerate() {
        let text_end = markers
            .get(idx + 1)
            .map_or(article.body.len(), |next| next.start());
        let text = article
            .body
            .get(marker.end()..text_end)
            .unwrap_or_default()
            .trim();

        if text.chars().count() < MIN_SECTION_TEXT_CHARS {
            continue;
        }

        sections.push(Section {
            article: article.title.clone(),
            section: marker.as_str().to_string(),
            content: text.to_string(),
            page: article.page,
        });
    }

    sections
}

/// Newline-joins page contents, recording where each page starts so marker
/// positions can be mapped back to a page number.
pub(crate) fn combine_pages(pages: &[Page]) -> (String, Vec<(usize, u32)>) {
    let mut buffer = String::new();
    let mut offsets = Vec::with_capacity(pages.len());

    for page in pages {
        offsets.push((buffer.len(), page.number));
        buffer.push_str(&page.content);
        buffer.push('\n');
    }

    (buffer, offsets)
}

fn page_at_offset(offsets: &[(usize, u32)], position: usize) -> Option<u32> {
    offsets
        .iter()
        .take_while(|(start, _)| *start <= position)
        .last()
        .map(|(_, number)| *number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, content: &str) -> Page {
        Page {
            number,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_split_into_articles_finds_marker_spans() {
        let pages = vec![
            page(
                1,
                "ARTICLE B1: Definitions\nGeneral definitions applying throughout.\n",
            ),
            page(
                2,
                "ARTICLE B2: Licences\nAll drivers must hold a valid super licence.",
            ),
        ];

        let articles = split_into_articles(&pages);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "ARTICLE B1: Definitions");
        assert!(articles[0].body.contains("General definitions"));
        assert_eq!(articles[0].page, Some(1));
        assert_eq!(articles[1].page, Some(2));
    }

    #[test]
    fn test_split_into_articles_discards_short_bodies() {
        let pages = vec![page(1, "ARTICLE B1: Title only\nshort\nARTICLE B2: Real\nThis body is comfortably long enough to keep.")];

        let articles = split_into_articles(&pages);

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "ARTICLE B2: Real");
    }

    #[test]
    fn test_split_into_articles_empty_without_markers() {
        let pages = vec![page(1, "Technical appendix without any structural markers at all.")];
        assert!(split_into_articles(&pages).is_empty());
    }

    #[test]
    fn test_split_into_sections_intro_and_markers() {
        let article = Article {
            title: "ARTICLE B1: Definitions".into(),
            body: "Introductory words before numbering. B1.7.3 Pit lane speed limit is 60 km/h. B1.7.4 Exceptional conditions apply.".into(),
            page: Some(4),
        };

        let sections = split_into_sections(&article);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].section, "intro");
        assert_eq!(sections[1].section, "B1.7.3");
        assert!(sections[1].content.contains("60 km/h"));
        assert_eq!(sections[2].section, "B1.7.4");
        assert!(sections.iter().all(|s| s.page == Some(4)));
    }

    #[test]
    fn test_split_into_sections_skips_short_text() {
        let article = Article {
            title: "ARTICLE B3".into(),
            body: "B3.1 ok B3.2 This one has enough content to survive the filter.".into(),
            page: None,
        };

        let sections = split_into_sections(&article);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section, "B3.2");
    }

    #[test]
    fn test_section_marker_requires_whole_token() {
        let article = Article {
            title: "ARTICLE B1".into(),
            body: "See annexB1.2.3 for details which must not split here because the marker is embedded.".into(),
            page: None,
        };

        let sections = split_into_sections(&article);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section, "intro");
    }
}
