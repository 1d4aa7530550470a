pub mod competitor_analysis;
pub mod idea_understanding;
pub mod market_analyst;
pub mod risk_assessor;
pub mod swot_analysis;
