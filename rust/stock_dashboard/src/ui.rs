// src/ui.rs
//
// ratatui widgets for each dashboard section, stacked top to bottom in page order.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Cell, Chart, Dataset, GraphType, List, ListItem,
        Paragraph, Row, Table, Widget, Wrap,
    },
    Frame,
};

use crate::render::{
    Dashboard, IncomeChartView, OverviewView, PriceChartView, RatioTableView,
    RecommendationListView, StatusIndicator, NET_INCOME_LABEL, TOTAL_REVENUE_LABEL,
};

pub const DEFAULT_WIDTH: u16 = 100;

const PRICE_CHART_HEIGHT: u16 = 14;
const INCOME_CHART_HEIGHT: u16 = 12;
const INCOME_BAR_WIDTH: u16 = 8;

const REVENUE_COLOR: Color = Color::Blue;
const NET_INCOME_COLOR: Color = Color::Green;
const LOSS_COLOR: Color = Color::Red;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Status,
    Overview,
    Prices,
    Ratios,
    Recommendations,
    Income,
}

/// Draw every visible section of `dashboard` into the frame.
pub fn draw(frame: &mut Frame, dashboard: &Dashboard<'_>) {
    let area = frame.area();
    render_sections(dashboard, area, frame.buffer_mut());
}

/// Render `dashboard` into an off-screen buffer `width` cells wide and exactly as tall as
/// its visible sections.
pub fn render_dashboard(dashboard: &Dashboard<'_>, width: u16) -> Buffer {
    let area = Rect::new(0, 0, width, dashboard_height(dashboard, width));
    let mut buf = Buffer::empty(area);
    render_sections(dashboard, area, &mut buf);
    buf
}

pub fn dashboard_height(dashboard: &Dashboard<'_>, width: u16) -> u16 {
    sections(dashboard, width).iter().map(|(_, height)| height).sum()
}

/// Plain text of a rendered buffer, one line per row, trailing blanks trimmed.
pub fn to_text(buf: &Buffer) -> String {
    let area = buf.area;
    let mut text = String::new();
    for y in area.top()..area.bottom() {
        let row: String = (area.left()..area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect();
        text.push_str(row.trim_end());
        text.push('\n');
    }
    text
}

fn sections(dashboard: &Dashboard<'_>, width: u16) -> Vec<(Section, u16)> {
    let mut sections = Vec::new();

    if dashboard.status != StatusIndicator::Hidden {
        sections.push((Section::Status, 1));
    }
    if let Some(view) = &dashboard.overview {
        let height = overview_widget(view).line_count(width);
        sections.push((Section::Overview, clamp_height(height)));
    }
    if dashboard.price_chart.is_some() {
        sections.push((Section::Prices, PRICE_CHART_HEIGHT));
    }
    if let Some(view) = &dashboard.ratio_table {
        // borders plus header
        sections.push((Section::Ratios, clamp_height(view.rows.len() + 3)));
    }
    if let Some(view) = &dashboard.recommendations {
        sections.push((Section::Recommendations, clamp_height(view.items.len() * 2 + 2)));
    }
    if dashboard.income_chart.is_some() {
        sections.push((Section::Income, INCOME_CHART_HEIGHT));
    }

    sections
}

fn clamp_height(lines: usize) -> u16 {
    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn render_sections(dashboard: &Dashboard<'_>, area: Rect, buf: &mut Buffer) {
    let sections = sections(dashboard, area.width);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(sections.iter().map(|(_, height)| Constraint::Length(*height)))
        .split(area);

    for ((section, _), chunk) in sections.iter().zip(chunks.iter().copied()) {
        match section {
            Section::Status => status_widget(&dashboard.status).render(chunk, buf),
            Section::Overview => {
                if let Some(view) = &dashboard.overview {
                    overview_widget(view).render(chunk, buf);
                }
            }
            Section::Prices => {
                if let Some(view) = &dashboard.price_chart {
                    let data = price_series(view);
                    price_chart_widget(view, &data).render(chunk, buf);
                }
            }
            Section::Ratios => {
                if let Some(view) = &dashboard.ratio_table {
                    ratio_table_widget(view).render(chunk, buf);
                }
            }
            Section::Recommendations => {
                if let Some(view) = &dashboard.recommendations {
                    recommendation_widget(view).render(chunk, buf);
                }
            }
            Section::Income => {
                if let Some(view) = &dashboard.income_chart {
                    income_chart_widget(view).render(chunk, buf);
                }
            }
        }
    }
}

fn status_widget(status: &StatusIndicator) -> Paragraph<'_> {
    let line = match status {
        StatusIndicator::Hidden => Line::default(),
        StatusIndicator::Loading(id) => Line::styled(
            format!("Analyzing... (request {id})"),
            Style::default().fg(Color::Yellow),
        ),
        StatusIndicator::Error { message, .. } => Line::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    Paragraph::new(line)
}

fn overview_widget<'a>(view: &OverviewView<'a>) -> Paragraph<'a> {
    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Current Price: ", label),
            Span::raw(format!("${:.2}", view.price)),
            Span::raw("    "),
            Span::styled("Sector: ", label),
            Span::raw(view.sector),
        ]),
        Line::from(vec![
            Span::styled("Industry: ", label),
            Span::raw(view.industry),
            Span::raw("    "),
            Span::styled("Country: ", label),
            Span::raw(view.country),
        ]),
    ];
    if !view.website.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Website: ", label),
            Span::styled(view.website, Style::default().fg(Color::Cyan)),
        ]));
    }
    if !view.summary.is_empty() {
        lines.push(Line::default());
        lines.push(Line::raw(view.summary));
    }

    Paragraph::new(lines)
        .block(Block::bordered().title(Span::styled(
            view.name,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .wrap(Wrap { trim: true })
}

// x is the point's position in the ascending series
fn price_series(view: &PriceChartView<'_>) -> Vec<(f64, f64)> {
    view.points
        .iter()
        .enumerate()
        .map(|(i, point)| (i as f64, point.price))
        .collect()
}

fn price_chart_widget<'a>(view: &PriceChartView<'_>, data: &'a [(f64, f64)]) -> Chart<'a> {
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(data);

    let x_max = (data.len().saturating_sub(1) as f64).max(1.0);
    let date_label = |date: Option<chrono::NaiveDate>| {
        Span::raw(date.map(|d| d.to_string()).unwrap_or_default())
    };

    // a flat series still needs a non-empty y range
    let (y_min, y_max) = if view.max > view.min {
        (view.min, view.max)
    } else {
        (view.min - 1.0, view.max + 1.0)
    };

    Chart::new(vec![dataset])
        .block(Block::bordered().title("Historical Stock Prices"))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![date_label(view.first_date()), date_label(view.last_date())]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.2}")),
                    Span::raw(format!("{y_max:.2}")),
                ]),
        )
}

fn ratio_table_widget(view: &RatioTableView) -> Table<'_> {
    let header = Row::new(vec![Cell::from("Ratio"), Cell::from("Value")])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = view.rows.iter().map(|row| {
        let value = match row.value {
            Some(v) => Cell::from(v.to_string()),
            None => Cell::from("N/A").style(Style::default().fg(Color::DarkGray)),
        };
        Row::new(vec![Cell::from(row.label.as_str()), value])
    });

    Table::new(rows, [Constraint::Percentage(60), Constraint::Percentage(40)])
        .header(header)
        .block(Block::bordered().title("Financial Ratios"))
}

fn recommendation_widget<'a>(view: &RecommendationListView<'a>) -> List<'a> {
    let items = view.items.iter().map(|item| {
        ListItem::new(vec![
            Line::styled(item.header, Style::default().add_modifier(Modifier::BOLD)),
            Line::raw(format!("  {}", item.description)),
        ])
    });

    List::new(items).block(Block::bordered().title("Recent Analyst Recommendations"))
}

fn income_chart_widget(view: &IncomeChartView<'_>) -> BarChart<'static> {
    let title = Line::from(vec![
        Span::raw("Income Statements  "),
        Span::styled(TOTAL_REVENUE_LABEL, Style::default().fg(REVENUE_COLOR)),
        Span::raw(" / "),
        Span::styled(NET_INCOME_LABEL, Style::default().fg(NET_INCOME_COLOR)),
    ]);

    let mut chart = BarChart::default()
        .block(Block::bordered().title(title))
        .bar_width(INCOME_BAR_WIDTH)
        .bar_gap(1)
        .group_gap(3)
        .max((view.max.ceil() as u64).max(1))
        .value_style(Style::default().fg(Color::Black).bg(Color::White));

    for statement in view.bars {
        let bars = [
            income_bar(statement.total_revenue, REVENUE_COLOR),
            income_bar(statement.net_income, NET_INCOME_COLOR),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(statement.year.to_string()))
                .bars(&bars),
        );
    }

    chart
}

// Bars grow with magnitude; a loss is drawn in its own color
fn income_bar(value: Option<f64>, color: Color) -> Bar<'static> {
    match value {
        Some(v) => Bar::default()
            .value(v.abs().round() as u64)
            .text_value(compact(v))
            .style(Style::default().fg(if v < 0.0 { LOSS_COLOR } else { color })),
        None => Bar::default().value(0).text_value("N/A".to_string()),
    }
}

// 60922000000 -> "60.92B"
fn compact(value: f64) -> String {
    let magnitude = value.abs();
    let (divisor, suffix) = if magnitude >= 1e12 {
        (1e12, "T")
    } else if magnitude >= 1e9 {
        (1e9, "B")
    } else if magnitude >= 1e6 {
        (1e6, "M")
    } else if magnitude >= 1e3 {
        (1e3, "K")
    } else {
        (1.0, "")
    };
    format!("{:.2}{}", value / divisor, suffix)
}
