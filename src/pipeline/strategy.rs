//! Table-detection heuristics.
//!
//! Two strategies sit behind the [`TableStrategy`] trait:
//!
//! * [`StreamStrategy`]: borderless tables. Text fragments are grouped into
//!   lines by vertical position, lines into cells by horizontal gaps, and
//!   runs of multi-cell lines into table regions. Column boundaries come from
//!   the rows with the most common cell count.
//!
//! * [`LatticeStrategy`]: ruled tables. Thin path objects become rulings;
//!   rulings that touch form a grid and text is dropped into the grid cell
//!   containing its centre.
//!
//! In both cases the first grid row becomes the header.

use crate::config::{LatticeSettings, StrategyKind, StreamSettings};
use crate::pipeline::layout::{DocumentLayout, PageLayout, Rect, TextFragment};
use crate::table::RawTable;
use std::collections::HashMap;
use tracing::debug;

/// A table-detection heuristic.
pub trait TableStrategy {
    fn kind(&self) -> StrategyKind;

    /// Every table found on the document's pages, in page order.
    fn attempt(&self, document: &DocumentLayout) -> Vec<RawTable>;
}

/// Build the strategy for `kind` with the given tolerances.
pub fn strategy_for(
    kind: StrategyKind,
    stream: StreamSettings,
    lattice: LatticeSettings,
) -> Box<dyn TableStrategy> {
    match kind {
        StrategyKind::Stream => Box::new(StreamStrategy::new(stream)),
        StrategyKind::Lattice => Box::new(LatticeStrategy::new(lattice)),
    }
}

// ── Stream ───────────────────────────────────────────────────────────────

/// Whitespace-delimited tables.
#[derive(Debug, Clone, Default)]
pub struct StreamStrategy {
    settings: StreamSettings,
}

/// A horizontal span of text within one line.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    x0: f32,
    x1: f32,
}

impl Span {
    fn center(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }
}

impl StreamStrategy {
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }

    fn tables_on_page(&self, page: &PageLayout) -> Vec<RawTable> {
        let lines: Vec<Vec<Span>> = group_lines(&page.fragments, self.settings.row_tolerance)
            .into_iter()
            .map(|line| split_spans(&line, self.settings.column_gap))
            .collect();

        let mut tables = Vec::new();
        let mut start = 0;
        while start < lines.len() {
            if lines[start].len() < self.settings.min_cols {
                start += 1;
                continue;
            }
            let mut end = start;
            while end < lines.len() && lines[end].len() >= self.settings.min_cols {
                end += 1;
            }
            if end - start >= self.settings.min_rows {
                let grid = align_columns(&lines[start..end]);
                let table = RawTable::from_grid(grid).with_provenance(page.number, StrategyKind::Stream);
                if !table.is_empty() {
                    tables.push(table);
                }
            }
            start = end;
        }
        tables
    }
}

impl TableStrategy for StreamStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Stream
    }

    fn attempt(&self, document: &DocumentLayout) -> Vec<RawTable> {
        let tables: Vec<RawTable> = document
            .pages
            .iter()
            .flat_map(|page| self.tables_on_page(page))
            .collect();
        debug!("stream: {} tables in {}", tables.len(), document.path.display());
        tables
    }
}

/// Group fragments whose vertical centres lie within `tolerance` of the
/// running line centre. Lines come out top to bottom, fragments left to right.
fn group_lines(fragments: &[TextFragment], tolerance: f32) -> Vec<Vec<&TextFragment>> {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.bbox.center_y().total_cmp(&b.bbox.center_y()));

    let mut lines: Vec<(f32, Vec<&TextFragment>)> = Vec::new();
    for frag in sorted {
        let cy = frag.bbox.center_y();
        match lines.last_mut() {
            Some((center, members)) if (cy - *center).abs() <= tolerance => {
                members.push(frag);
                *center = members.iter().map(|f| f.bbox.center_y()).sum::<f32>() / members.len() as f32;
            }
            _ => lines.push((cy, vec![frag])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            members
        })
        .collect()
}

/// Merge neighbouring fragments of a line unless the gap between them
/// exceeds `column_gap`.
fn split_spans(line: &[&TextFragment], column_gap: f32) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    for frag in line {
        match spans.last_mut() {
            Some(span) if frag.bbox.x0 - span.x1 <= column_gap => {
                span.text.push(' ');
                span.text.push_str(frag.text.trim());
                span.x1 = span.x1.max(frag.bbox.x1);
            }
            _ => spans.push(Span {
                text: frag.text.trim().to_string(),
                x0: frag.bbox.x0,
                x1: frag.bbox.x1,
            }),
        }
    }
    spans
}

/// Lay the spans of a table region onto a common set of columns.
///
/// Column bands come from the rows whose span count is the most common one
/// (ties favour more columns); every span is then assigned to the band whose
/// boundaries contain its centre.
fn align_columns(rows: &[Vec<Span>]) -> Vec<Vec<String>> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.len()).or_default() += 1;
    }
    let Some(n_cols) = counts
        .iter()
        .max_by_key(|(len, freq)| (**freq, **len))
        .map(|(len, _)| *len)
    else {
        return Vec::new();
    };

    let mut bands: Vec<(f32, f32)> = vec![(f32::MAX, f32::MIN); n_cols];
    for row in rows.iter().filter(|r| r.len() == n_cols) {
        for (band, span) in bands.iter_mut().zip(row) {
            band.0 = band.0.min(span.x0);
            band.1 = band.1.max(span.x1);
        }
    }

    // Boundary between band j and j+1 is the midpoint of the gap between them.
    let boundaries: Vec<f32> = bands
        .windows(2)
        .map(|w| (w[0].1 + w[1].0) / 2.0)
        .collect();

    rows.iter()
        .map(|row| {
            let mut cells = vec![String::new(); n_cols];
            for span in row {
                let col = boundaries.iter().take_while(|&&b| span.center() > b).count();
                let cell = &mut cells[col];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&span.text);
            }
            cells
        })
        .collect()
}

// ── Lattice ──────────────────────────────────────────────────────────────

/// Ruled tables.
#[derive(Debug, Clone, Default)]
pub struct LatticeStrategy {
    settings: LatticeSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ruling {
    /// y, x0, x1
    Horizontal(f32, f32, f32),
    /// x, y0, y1
    Vertical(f32, f32, f32),
}

impl LatticeStrategy {
    pub fn new(settings: LatticeSettings) -> Self {
        Self { settings }
    }

    /// Thin paths become rulings; larger rectangles contribute their four edges.
    fn rulings(&self, paths: &[Rect]) -> Vec<Ruling> {
        let LatticeSettings {
            max_ruling_thickness: thick,
            min_ruling_length: min_len,
            ..
        } = self.settings;

        let mut out = Vec::new();
        for r in paths {
            let (w, h) = (r.width(), r.height());
            if h <= thick && w >= min_len {
                out.push(Ruling::Horizontal(r.center_y(), r.x0, r.x1));
            } else if w <= thick && h >= min_len {
                out.push(Ruling::Vertical(r.center_x(), r.y0, r.y1));
            } else if w >= min_len && h >= min_len {
                out.push(Ruling::Horizontal(r.y0, r.x0, r.x1));
                out.push(Ruling::Horizontal(r.y1, r.x0, r.x1));
                out.push(Ruling::Vertical(r.x0, r.y0, r.y1));
                out.push(Ruling::Vertical(r.x1, r.y0, r.y1));
            }
        }
        merge_rulings(out, self.settings.snap_tolerance)
    }

    fn tables_on_page(&self, page: &PageLayout) -> Vec<RawTable> {
        let snap = self.settings.snap_tolerance;
        let rulings = self.rulings(&page.paths);
        if rulings.is_empty() {
            return Vec::new();
        }

        let mut tables = Vec::new();
        for component in connected_components(&rulings, snap) {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for &i in &component {
                match rulings[i] {
                    Ruling::Horizontal(y, ..) => ys.push(y),
                    Ruling::Vertical(x, ..) => xs.push(x),
                }
            }
            let xs = cluster_positions(xs, snap);
            let ys = cluster_positions(ys, snap);
            if xs.len() < 2 || ys.len() < 2 {
                continue;
            }

            let grid = fill_grid(&xs, &ys, &page.fragments);
            let table = RawTable::from_grid(grid).with_provenance(page.number, StrategyKind::Lattice);
            if !table.is_empty() {
                tables.push(table);
            }
        }
        tables
    }
}

impl TableStrategy for LatticeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lattice
    }

    fn attempt(&self, document: &DocumentLayout) -> Vec<RawTable> {
        let tables: Vec<RawTable> = document
            .pages
            .iter()
            .flat_map(|page| self.tables_on_page(page))
            .collect();
        debug!("lattice: {} tables in {}", tables.len(), document.path.display());
        tables
    }
}

/// Join collinear rulings that overlap or nearly touch.
fn merge_rulings(rulings: Vec<Ruling>, snap: f32) -> Vec<Ruling> {
    let mut horizontal: Vec<(f32, f32, f32)> = Vec::new();
    let mut vertical: Vec<(f32, f32, f32)> = Vec::new();
    for r in rulings {
        match r {
            Ruling::Horizontal(y, a, b) => horizontal.push((y, a, b)),
            Ruling::Vertical(x, a, b) => vertical.push((x, a, b)),
        }
    }

    let merge = |mut segs: Vec<(f32, f32, f32)>| -> Vec<(f32, f32, f32)> {
        segs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        let mut out: Vec<(f32, f32, f32)> = Vec::new();
        for seg in segs {
            match out
                .iter_mut()
                .rev()
                .find(|o| (o.0 - seg.0).abs() <= snap && seg.1 <= o.2 + snap && seg.2 >= o.1 - snap)
            {
                Some(o) => {
                    o.1 = o.1.min(seg.1);
                    o.2 = o.2.max(seg.2);
                }
                None => out.push(seg),
            }
        }
        out
    };

    merge(horizontal)
        .into_iter()
        .map(|(y, a, b)| Ruling::Horizontal(y, a, b))
        .chain(merge(vertical).into_iter().map(|(x, a, b)| Ruling::Vertical(x, a, b)))
        .collect()
}

fn crosses(h: (f32, f32, f32), v: (f32, f32, f32), snap: f32) -> bool {
    let (y, hx0, hx1) = h;
    let (x, vy0, vy1) = v;
    x >= hx0 - snap && x <= hx1 + snap && y >= vy0 - snap && y <= vy1 + snap
}

/// Group rulings into sets connected through horizontal/vertical crossings.
/// Only sets with at least two rulings of each orientation are returned.
fn connected_components(rulings: &[Ruling], snap: f32) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..rulings.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..rulings.len() {
        for j in (i + 1)..rulings.len() {
            let touching = match (rulings[i], rulings[j]) {
                (Ruling::Horizontal(y, a, b), Ruling::Vertical(x, c, d))
                | (Ruling::Vertical(x, c, d), Ruling::Horizontal(y, a, b)) => {
                    crosses((y, a, b), (x, c, d), snap)
                }
                _ => false,
            };
            if touching {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..rulings.len() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => groups.push((root, vec![i])),
        }
    }

    groups
        .into_iter()
        .map(|(_, members)| members)
        .filter(|members| {
            let h = members
                .iter()
                .filter(|&&i| matches!(rulings[i], Ruling::Horizontal(..)))
                .count();
            h >= 2 && members.len() - h >= 2
        })
        .collect()
}

/// Sort positions and collapse those within `snap` of each other to their mean.
fn cluster_positions(mut values: Vec<f32>, snap: f32) -> Vec<f32> {
    values.sort_by(f32::total_cmp);
    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some(c) if c.last().is_some_and(|last| v - last <= snap) => c.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .into_iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Drop each fragment into the grid cell containing its centre.
fn fill_grid(xs: &[f32], ys: &[f32], fragments: &[TextFragment]) -> Vec<Vec<String>> {
    let mut grid = vec![vec![String::new(); xs.len() - 1]; ys.len() - 1];
    for frag in fragments {
        let (cx, cy) = (frag.bbox.center_x(), frag.bbox.center_y());
        let col = xs.windows(2).position(|w| cx >= w[0] && cx <= w[1]);
        let row = ys.windows(2).position(|w| cy >= w[0] && cy <= w[1]);
        if let (Some(r), Some(c)) = (row, col) {
            let cell = &mut grid[r][c];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(frag.text.trim());
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn frag(text: &str, x: f32, y: f32) -> TextFragment {
        let w = text.chars().count() as f32 * 5.0;
        TextFragment::new(text, x, y, x + w, y + 9.0)
    }

    fn doc(page: PageLayout) -> DocumentLayout {
        DocumentLayout {
            path: "test.pdf".into(),
            total_pages: 1,
            pages: vec![page],
        }
    }

    fn borderless_page() -> PageLayout {
        let mut page = PageLayout {
            number: 3,
            width: 595.0,
            height: 842.0,
            ..Default::default()
        };
        page.fragments = vec![
            frag("Tabela 12 - Ocorrências registradas por UF", 50.0, 60.0),
            frag("UF", 50.0, 100.0),
            frag("Feminicídio", 200.0, 100.0),
            frag("Estupro", 320.0, 100.0),
            frag("Amazonas", 50.0, 115.0),
            frag("10", 210.0, 115.0),
            frag("20", 330.0, 115.0),
            frag("Mato", 50.0, 130.0),
            frag("Grosso", 73.0, 130.0),
            frag("5", 212.0, 130.0),
            frag("7", 332.0, 130.0),
            frag("Roraima", 50.0, 145.0),
            frag("3", 212.0, 145.0),
            frag("4", 332.0, 145.0),
            frag("Fonte: SINESP", 50.0, 200.0),
        ];
        page
    }

    #[test]
    fn stream_recovers_borderless_grid() {
        let tables = StreamStrategy::default().attempt(&doc(borderless_page()));
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.column_names(), vec!["UF", "Feminicídio", "Estupro"]);
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.row(1), vec![Cell::from("Mato Grosso"), "5".into(), "7".into()]);
        assert_eq!(t.page, Some(3));
        assert_eq!(t.strategy, Some(StrategyKind::Stream));
    }

    #[test]
    fn stream_fills_missing_cells_by_position() {
        let mut page = borderless_page();
        // Drop the Roraima/Feminicídio value: the remaining "4" still lands
        // under Estupro.
        page.fragments.retain(|f| !(f.text == "3" && f.bbox.y0 == 145.0));
        let tables = StreamStrategy::default().attempt(&doc(page));
        assert_eq!(
            tables[0].row(2),
            vec![Cell::from("Roraima"), Cell::Empty, "4".into()]
        );
    }

    #[test]
    fn stream_ignores_prose() {
        let page = PageLayout {
            number: 1,
            fragments: vec![
                frag("Este relatório apresenta os dados consolidados.", 50.0, 100.0),
                frag("Os valores são absolutos.", 50.0, 115.0),
            ],
            ..Default::default()
        };
        assert!(StreamStrategy::default().attempt(&doc(page)).is_empty());
    }

    fn hline(y: f32, x0: f32, x1: f32) -> Rect {
        Rect::new(x0, y - 0.5, x1, y + 0.5)
    }

    fn vline(x: f32, y0: f32, y1: f32) -> Rect {
        Rect::new(x - 0.5, y0, x + 0.5, y1)
    }

    fn ruled_page() -> PageLayout {
        let mut page = PageLayout {
            number: 7,
            ..Default::default()
        };
        for y in [100.0, 120.0, 140.0, 160.0] {
            page.paths.push(hline(y, 40.0, 340.0));
        }
        for x in [40.0, 180.0, 260.0, 340.0] {
            page.paths.push(vline(x, 100.0, 160.0));
        }
        page.fragments = vec![
            frag("UF", 45.0, 105.0),
            frag("Feminicídio", 185.0, 105.0),
            frag("Estupro", 265.0, 105.0),
            frag("Acre", 45.0, 125.0),
            frag("2", 185.0, 125.0),
            frag("11", 265.0, 125.0),
            frag("Roraima", 45.0, 145.0),
            frag("6", 185.0, 145.0),
            frag("9", 265.0, 145.0),
            frag("Fora da tabela", 45.0, 300.0),
        ];
        page
    }

    #[test]
    fn lattice_recovers_ruled_grid() {
        let tables = LatticeStrategy::default().attempt(&doc(ruled_page()));
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.column_names(), vec!["UF", "Feminicídio", "Estupro"]);
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.row(0), vec![Cell::from("Acre"), "2".into(), "11".into()]);
        assert_eq!(t.row(1), vec![Cell::from("Roraima"), "6".into(), "9".into()]);
        assert_eq!(t.strategy, Some(StrategyKind::Lattice));
    }

    #[test]
    fn lattice_reads_a_grid_drawn_as_one_path() {
        use crate::pipeline::layout::{path_lines, PathStep};

        let mut steps = Vec::new();
        for y in [100.0, 120.0, 140.0, 160.0] {
            steps.push(PathStep::MoveTo(40.0, y));
            steps.push(PathStep::LineTo(340.0, y));
        }
        for x in [40.0, 180.0, 260.0, 340.0] {
            steps.push(PathStep::MoveTo(x, 100.0));
            steps.push(PathStep::LineTo(x, 160.0));
        }
        let mut page = ruled_page();
        page.paths = path_lines(&steps);
        assert_eq!(page.paths.len(), 8);

        let tables = LatticeStrategy::default().attempt(&doc(page));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_names(), vec!["UF", "Feminicídio", "Estupro"]);
        assert_eq!(tables[0].row(1), vec![Cell::from("Roraima"), "6".into(), "9".into()]);
    }

    #[test]
    fn lattice_uses_rectangle_edges() {
        let mut page = ruled_page();
        page.paths = vec![
            Rect::new(40.0, 100.0, 180.0, 120.0),
            Rect::new(180.0, 100.0, 340.0, 120.0),
            Rect::new(40.0, 120.0, 180.0, 140.0),
            Rect::new(180.0, 120.0, 340.0, 140.0),
        ];
        page.fragments.retain(|f| f.bbox.y0 < 140.0 && f.bbox.x0 < 260.0);
        let tables = LatticeStrategy::default().attempt(&doc(page));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_names(), vec!["UF", "Feminicídio"]);
        assert_eq!(tables[0].row(0), vec![Cell::from("Acre"), "2".into()]);
    }

    #[test]
    fn lattice_needs_two_rulings_each_way() {
        let mut page = ruled_page();
        page.paths = vec![hline(100.0, 40.0, 340.0), vline(40.0, 100.0, 160.0)];
        assert!(LatticeStrategy::default().attempt(&doc(page)).is_empty());
    }

    #[test]
    fn separate_ruled_blocks_are_separate_tables() {
        let mut page = ruled_page();
        let mut second = Vec::new();
        for y in [400.0, 420.0, 440.0] {
            second.push(hline(y, 40.0, 200.0));
        }
        for x in [40.0, 120.0, 200.0] {
            second.push(vline(x, 400.0, 440.0));
        }
        page.paths.extend(second);
        page.fragments.extend([
            frag("UF", 45.0, 405.0),
            frag("Total", 125.0, 405.0),
            frag("Amazonas", 45.0, 425.0),
            frag("31", 125.0, 425.0),
        ]);
        let tables = LatticeStrategy::default().attempt(&doc(page));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].column_names(), vec!["UF", "Total"]);
    }

    #[test]
    fn cluster_positions_snaps_close_values() {
        assert_eq!(cluster_positions(vec![10.0, 11.0, 50.0, 12.0], 3.0), vec![11.0, 50.0]);
    }
}
