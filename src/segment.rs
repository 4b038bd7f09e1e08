/// Extracted text of a single page, in physical page order.
pub type PageText = String;

/// Page range to generate from. `start` is inclusive, `end` exclusive and
/// defaults to the document length. Values are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl PageRange {
    pub fn new(start: i64, end: Option<i64>) -> Self {
        Self { start, end }
    }

    /// Clamped `[start, end)` bounds for a sequence of `len` pages.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let clamp = |v: i64| v.clamp(0, len as i64) as usize;
        let start = clamp(self.start);
        let end = clamp(self.end.unwrap_or(len as i64));
        if start > end {
            (start, start)
        } else {
            (start, end)
        }
    }
}

/// Select the pages covered by `range`. Out-of-bounds or inverted ranges give
/// a truncated or empty slice.
pub fn select(pages: &[PageText], range: PageRange) -> &[PageText] {
    let (start, end) = range.bounds(pages.len());
    &pages[start..end]
}

/// One unit of text submitted per generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position of the first page within the selected window.
    pub first_page: usize,
    pub pages: Vec<PageText>,
    /// Pages joined with `\n`.
    pub text: String,
}

impl Segment {
    fn from_pages(first_page: usize, pages: &[PageText]) -> Self {
        Self {
            first_page,
            pages: pages.to_vec(),
            text: pages.join("\n"),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentPolicy {
    /// Every selected page in one segment.
    #[default]
    Whole,
    /// Pack consecutive whole pages up to this many characters per segment.
    /// A page longer than the cap gets a segment of its own.
    MaxChars(usize),
}

/// Group pages into segments. Callers must handle any number of segments;
/// an empty page list yields none.
pub fn build(pages: &[PageText], policy: SegmentPolicy) -> Vec<Segment> {
    if pages.is_empty() {
        return Vec::new();
    }
    match policy {
        SegmentPolicy::Whole => vec![Segment::from_pages(0, pages)],
        SegmentPolicy::MaxChars(max) => pack_pages(pages, max),
    }
}

fn pack_pages(pages: &[PageText], max: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut chars = 0usize;

    for (i, page) in pages.iter().enumerate() {
        let len = page.chars().count();
        // +1 for the joining newline
        let added = if i == start { len } else { len + 1 };
        if i > start && chars + added > max {
            segments.push(Segment::from_pages(start, &pages[start..i]));
            start = i;
            chars = len;
        } else {
            chars += added;
        }
    }
    segments.push(Segment::from_pages(start, &pages[start..]));
    segments
}
