//! Fixed instructions for the reduce passes.
//!
//! Bump [`TEMPLATE_VERSION`] whenever either template changes so stored summaries can be traced
//! back to the prompt that produced them.

/// Version tag of the templates below.
pub const TEMPLATE_VERSION: &str = "2024.1";

/// Instruction for the comprehensive (two-page) summary.
pub const COMPREHENSIVE_TEMPLATE: &str = "\
Please summarize the following financial reports according to this detailed template:

#### Business Overview
- Formation/Incorporation Date
- Headquarters Location
- Business Description
- Employee Count
- Latest Revenues
- Stock Exchange Listing
- Market Capitalization
- Number of Offices and Locations
- Clients/Customers

#### Business Segment Overview
- Overview of Major Business Segments
- Revenue Percentage by Segment (provide this content in commas and not bullet points)

#### Performance Analysis
- Year-over-Year Performance Comparison
- Sales Increase/Decrease Explanation

#### Geographical Sales Breakdown
- Sales and Revenue by Geography (provide this content in commas and not bullet points)

#### Regional Sales Analysis
- Explanation of Sales Fluctuations by Region

#### Year-over-Year Sales Analysis
- Overall Sales Increase/Decline
- Reasons for Year-over-Year Changes

#### Rationale & Considerations
- Key Risks
- Mitigating Factors
- Future Outlook
- Strategic Initiatives

#### SWOT Analysis
- Strengths
- Weaknesses
- Opportunities
- Threats

#### Credit Rating Information
- Current Credit Rating
- Recent Changes in Credit Rating
- Changes in Rating Outlook

Ensure the summary is concise, accurate, and covers all the specified sections. Use bullet points for clarity and limit the summary to 2 pages.";

/// Instruction for the concise (one-page) summary.
pub const CONCISE_TEMPLATE: &str = "\
Please summarize the following 2-page financial report summary into a concise 1-page summary:

### 1-Page Summary

#### Business Overview
- Brief overview of company formation, headquarters, business description
- Key figures: employee count, latest revenues, stock exchange listing, market capitalization

#### Business Segment Overview
- Overview of major business segments
- Revenue percentage by segment (provide this content in commas and not bullet points)

#### Performance Analysis
- Year-over-Year performance comparison
- Key sales increase/decrease explanation

#### Geographical Sales Breakdown
- Main sales and revenue by geography (provide this content in commas and not bullet points)
- Brief explanation of significant regional sales fluctuations

#### Year-over-Year Sales Analysis
- Overall sales increase/decline
- Key reasons for year-over-year changes

#### Rationale & Considerations
- Top key risks and mitigating factors
- Brief future outlook and strategic initiatives

#### SWOT Analysis Highlights
- Key points from Strengths, Weaknesses, Opportunities, and Threats

Ensure the summary is concise, accurate, and covers all the specified sections. Use bullet points for clarity and limit the summary to 1 page.";

/// Instruction for the per-cluster summary of cluster `cluster_id` (zero-based).
pub fn cluster_instruction(cluster_id: usize) -> String {
    format!("Summarize the financial reports for cluster {}:", cluster_id + 1)
}
