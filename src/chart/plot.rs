//! Chart layouts: series and grids → [`Scene`]s.

use super::data::{HeatGrid, Series};
use crate::draw::{heat_color, series_color, text_width, Align, Color, FontStyle, Scene};
use crate::table::format_number;

const TITLE_SIZE: f32 = 15.0;
const LABEL_SIZE: f32 = 11.0;
const TICK_SIZE: f32 = 9.0;

/// Text around a plot.
#[derive(Debug, Clone, Default)]
pub struct Frame<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Legend heading (line charts) or colour-bar label (heatmaps).
    pub legend_title: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl PlotArea {
    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Round `raw` up to 1, 2, 2.5 or 5 times a power of ten.
pub fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 2.5 {
        2.5
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Y-axis ticks from zero to at least `max`, about five intervals.
pub fn axis_ticks(max: f64) -> Vec<f64> {
    let step = nice_step(max / 5.0);
    let count = (max / step).ceil().max(1.0) as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

fn draw_title(scene: &mut Scene, title: &str) {
    let x = scene.width / 2.0;
    scene.text(x, 28.0, title, TITLE_SIZE, FontStyle::Bold, Color::BLACK, Align::Center);
}

fn draw_no_data(scene: &mut Scene, area: PlotArea) {
    scene.text(
        area.left + area.width() / 2.0,
        area.top + area.height() / 2.0,
        "sem dados",
        LABEL_SIZE,
        FontStyle::Italic,
        Color::GREY,
        Align::Center,
    );
}

/// Line chart with markers, horizontal grid lines and a legend on the right.
pub fn line_chart(frame: &Frame<'_>, series: &[Series], width: f32, height: f32) -> Scene {
    let mut scene = Scene::new(width, height);
    scene.fill_rect(0.0, 0.0, width, height, Color::WHITE);
    draw_title(&mut scene, frame.title);

    let legend_width = series
        .iter()
        .map(|s| text_width(&s.label, TICK_SIZE, FontStyle::Regular) + 30.0)
        .chain(std::iter::once(
            text_width(frame.legend_title, TICK_SIZE, FontStyle::Bold) + 16.0,
        ))
        .fold(0.0f32, f32::max);
    let area = PlotArea {
        left: 70.0,
        top: 60.0,
        right: width - legend_width - 30.0,
        bottom: height - 58.0,
    };

    scene.text(
        area.left,
        area.top - 10.0,
        frame.y_label,
        LABEL_SIZE,
        FontStyle::Bold,
        Color::DARK_GREY,
        Align::Left,
    );
    scene.text(
        area.left + area.width() / 2.0,
        height - 16.0,
        frame.x_label,
        LABEL_SIZE,
        FontStyle::Bold,
        Color::DARK_GREY,
        Align::Center,
    );

    let mut years: Vec<i32> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .collect();
    years.sort_unstable();
    years.dedup();

    if years.is_empty() {
        scene.stroke_rect(area.left, area.top, area.width(), area.height(), Color::GREY, 0.8);
        draw_no_data(&mut scene, area);
        return scene;
    }

    // Y axis
    let max = series.iter().map(Series::max_value).fold(0.0, f64::max);
    let ticks = axis_ticks(max);
    let top_value = ticks.last().copied().unwrap_or(1.0).max(f64::EPSILON);
    let y_of = |v: f64| area.bottom - (v / top_value) as f32 * area.height();
    for &t in &ticks {
        let y = y_of(t);
        scene.line(area.left, y, area.right, y, Color::LIGHT_GREY, 0.6);
        scene.text(
            area.left - 6.0,
            y + TICK_SIZE / 3.0,
            format_number(t),
            TICK_SIZE,
            FontStyle::Regular,
            Color::DARK_GREY,
            Align::Right,
        );
    }

    // X axis: years evenly spaced, half a slot of padding on each side.
    let slot = area.width() / years.len() as f32;
    let x_of = |year: i32| {
        let i = years.iter().position(|&y| y == year).unwrap_or(0);
        area.left + slot * (i as f32 + 0.5)
    };
    for &year in &years {
        let x = x_of(year);
        scene.line(x, area.bottom, x, area.bottom + 4.0, Color::DARK_GREY, 0.8);
        scene.text(
            x,
            area.bottom + 16.0,
            year.to_string(),
            TICK_SIZE,
            FontStyle::Regular,
            Color::DARK_GREY,
            Align::Center,
        );
    }
    scene.line(area.left, area.bottom, area.right, area.bottom, Color::DARK_GREY, 1.0);
    scene.line(area.left, area.top, area.left, area.bottom, Color::DARK_GREY, 1.0);

    // Series
    for (i, s) in series.iter().enumerate() {
        let color = series_color(i);
        for pair in s.points.windows(2) {
            scene.line(x_of(pair[0].0), y_of(pair[0].1), x_of(pair[1].0), y_of(pair[1].1), color, 2.2);
        }
        for &(year, value) in &s.points {
            scene.circle(x_of(year), y_of(value), 3.2, color);
        }
    }

    // Legend
    let lx = area.right + 18.0;
    let mut ly = area.top + 4.0;
    let legend_height = 22.0 + series.len() as f32 * 16.0;
    scene.push(crate::draw::DrawOp::Rect {
        x: lx - 8.0,
        y: ly - 14.0,
        w: legend_width,
        h: legend_height,
        fill: Some(Color::WHITE),
        stroke: Some((Color::LIGHT_GREY, 0.8)),
    });
    scene.text(lx, ly, frame.legend_title, TICK_SIZE, FontStyle::Bold, Color::BLACK, Align::Left);
    for (i, s) in series.iter().enumerate() {
        ly += 16.0;
        let color = series_color(i);
        scene.line(lx, ly - 3.0, lx + 16.0, ly - 3.0, color, 2.2);
        scene.circle(lx + 8.0, ly - 3.0, 2.5, color);
        scene.text(lx + 22.0, ly, s.label.as_str(), TICK_SIZE, FontStyle::Regular, Color::BLACK, Align::Left);
    }

    scene
}

/// Annotated heatmap with a vertical colour bar.
pub fn heatmap(frame: &Frame<'_>, grid: &HeatGrid, width: f32, height: f32) -> Scene {
    let mut scene = Scene::new(width, height);
    scene.fill_rect(0.0, 0.0, width, height, Color::WHITE);
    draw_title(&mut scene, frame.title);

    let label_width = grid
        .regions
        .iter()
        .map(|r| text_width(r, TICK_SIZE, FontStyle::Regular))
        .fold(0.0f32, f32::max);
    let area = PlotArea {
        left: 40.0 + label_width,
        top: 60.0,
        right: width - 110.0,
        bottom: height - 58.0,
    };

    scene.text(
        area.left + area.width() / 2.0,
        height - 16.0,
        frame.x_label,
        LABEL_SIZE,
        FontStyle::Bold,
        Color::DARK_GREY,
        Align::Center,
    );
    scene.text(
        18.0,
        area.top - 10.0,
        frame.y_label,
        LABEL_SIZE,
        FontStyle::Bold,
        Color::DARK_GREY,
        Align::Left,
    );

    let Some((lo, hi)) = grid.range() else {
        scene.stroke_rect(area.left, area.top, area.width(), area.height(), Color::GREY, 0.8);
        draw_no_data(&mut scene, area);
        return scene;
    };
    let span = (hi - lo).max(f64::EPSILON);
    let cell_w = area.width() / grid.years.len().max(1) as f32;
    let cell_h = area.height() / grid.regions.len().max(1) as f32;
    let annotate_size = (cell_h * 0.3).clamp(6.0, 11.0).min(cell_w * 0.25);

    for (r, region) in grid.regions.iter().enumerate() {
        let y = area.top + r as f32 * cell_h;
        scene.text(
            area.left - 8.0,
            y + cell_h / 2.0 + TICK_SIZE / 3.0,
            region.as_str(),
            TICK_SIZE,
            FontStyle::Regular,
            Color::DARK_GREY,
            Align::Right,
        );
        for (c, value) in grid.values[r].iter().enumerate() {
            let x = area.left + c as f32 * cell_w;
            let fill = match value {
                Some(v) => heat_color(((v - lo) / span) as f32),
                None => Color::LIGHT_GREY,
            };
            scene.push(crate::draw::DrawOp::Rect {
                x,
                y,
                w: cell_w,
                h: cell_h,
                fill: Some(fill),
                stroke: Some((Color::WHITE, 1.0)),
            });
            if let Some(v) = value {
                let ink = if fill.luminance() < 0.5 {
                    Color::WHITE
                } else {
                    Color::BLACK
                };
                scene.text(
                    x + cell_w / 2.0,
                    y + cell_h / 2.0 + annotate_size / 3.0,
                    format!("{:.0}", v),
                    annotate_size,
                    FontStyle::Regular,
                    ink,
                    Align::Center,
                );
            }
        }
    }

    for (c, year) in grid.years.iter().enumerate() {
        scene.text(
            area.left + (c as f32 + 0.5) * cell_w,
            area.bottom + 16.0,
            year.to_string(),
            TICK_SIZE,
            FontStyle::Regular,
            Color::DARK_GREY,
            Align::Center,
        );
    }

    // Colour bar
    let bar_x = area.right + 24.0;
    let steps = 24;
    let step_h = area.height() / steps as f32;
    for i in 0..steps {
        let t = 1.0 - (i as f32 + 0.5) / steps as f32;
        scene.fill_rect(bar_x, area.top + i as f32 * step_h, 14.0, step_h + 0.5, heat_color(t));
    }
    scene.stroke_rect(bar_x, area.top, 14.0, area.height(), Color::GREY, 0.6);
    for (value, y) in [(hi, area.top), (lo, area.bottom)] {
        scene.text(
            bar_x + 18.0,
            y + TICK_SIZE / 3.0,
            format!("{:.0}", value),
            TICK_SIZE,
            FontStyle::Regular,
            Color::DARK_GREY,
            Align::Left,
        );
    }
    scene.text(
        bar_x - 4.0,
        area.top - 10.0,
        frame.legend_title,
        TICK_SIZE,
        FontStyle::Bold,
        Color::DARK_GREY,
        Align::Left,
    );

    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawOp;

    fn frame() -> Frame<'static> {
        Frame {
            title: "Comparativo entre Estados - Estupro (2020-2021)",
            x_label: "Ano",
            y_label: "Número de Ocorrências",
            legend_title: "Estado",
        }
    }

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(7.0), 10.0);
        assert_eq!(nice_step(18.0), 20.0);
        assert_eq!(nice_step(230.0), 250.0);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn ticks_cover_max() {
        let t = axis_ticks(873.0);
        assert_eq!(t.first(), Some(&0.0));
        assert!(*t.last().unwrap() >= 873.0);
        assert!(t.len() <= 7);
    }

    #[test]
    fn line_chart_draws_every_point_and_label() {
        let series = vec![
            Series {
                label: "Acre".into(),
                points: vec![(2020, 4.0), (2021, 6.0)],
            },
            Series {
                label: "Roraima".into(),
                points: vec![(2020, 9.0), (2021, 2.0)],
            },
        ];
        let scene = line_chart(&frame(), &series, 720.0, 420.0);
        let texts = scene.texts();
        assert!(texts.contains(&"Acre"));
        assert!(texts.contains(&"Roraima"));
        assert!(texts.contains(&"2021"));
        // 4 data markers plus 2 legend markers
        let circles = scene.ops.iter().filter(|op| matches!(op, DrawOp::Circle { .. })).count();
        assert_eq!(circles, 6);
    }

    #[test]
    fn points_stay_inside_the_page() {
        let series = vec![Series {
            label: "Estupro".into(),
            points: vec![(2015, 0.0), (2025, 1000.0)],
        }];
        let scene = line_chart(&frame(), &series, 720.0, 420.0);
        for op in &scene.ops {
            if let DrawOp::Circle { cx, cy, .. } = op {
                assert!(*cx > 0.0 && *cx < 720.0 && *cy > 0.0 && *cy < 420.0);
            }
        }
    }

    #[test]
    fn empty_series_says_so() {
        let scene = line_chart(&frame(), &[], 720.0, 420.0);
        assert!(scene.texts().contains(&"sem dados"));
    }

    #[test]
    fn heatmap_annotates_every_present_cell() {
        let grid = HeatGrid {
            regions: vec!["Acre".into(), "Roraima".into()],
            years: vec![2020, 2021],
            values: vec![vec![Some(10.0), Some(5.0)], vec![Some(9.0), None]],
        };
        let scene = heatmap(&frame(), &grid, 840.0, 360.0);
        let texts = scene.texts();
        for expected in ["10", "5", "9", "Acre", "Roraima", "2020", "2021"] {
            assert!(texts.contains(&expected), "missing {expected}");
        }
    }
}
