use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use super::SalesAssistant;
use crate::context::{compact, ContactContext};
use crate::progress::AgentProgress;
use crate::specialist::Specialist;
use crate::structured::{parse_structured, StructuredFallback};

const PROFILE_ANALYZER: &str = "You are an expert CRM data analyst specializing in behavioral analysis. Your task is to analyze contact data and communication history to identify patterns and insights about the customer's behavior, preferences, and needs.

YOUR TASK:
1. Analyze all available contact information, communication history, and deal history
2. Identify patterns in:
   - Communication style (formal/informal, brief/detailed, technical/non-technical)
   - Response patterns (quick/delayed, thorough/brief)
   - Preferred communication channels
   - Decision-making approach (analytical, emotional, consensus-driven, etc.)
   - Topics of interest and engagement levels
   - Pain points and challenges mentioned
3. Look for evidence of personality traits, work style, and professional motivations

IMPORTANT: Base your analysis ONLY on the actual data provided. If there's limited data, acknowledge the limitations and provide insights based on what's available. Do not make unfounded assumptions.

FORMAT YOUR RESPONSE:
- Provide a structured analysis with clear sections for different behavioral aspects
- Support observations with specific examples from the data
- Note the confidence level for each insight based on available evidence
- Keep your entire response under 800 words";

const PERSONA_GENERATOR: &str = "You are a sales psychologist specializing in customer persona development. Your task is to create a detailed behavioral profile based on contact data and analysis.

YOUR TASK:
1. Create a customer persona with the following components:
   - summary: Brief overview of who this person is professionally (max 100 words)
   - communicationStyle: Their preferred communication approach (max 50 words)
   - decisionFactors: What drives their decision-making (max 50 words)
   - painPoints: Array of 3 likely professional pain points
   - interests: Array of 3 likely professional interests
   - traits: Array of objects with {trait, description, confidence} where confidence is 1-100

IMPORTANT: Return ONLY a valid JSON object. DO NOT use markdown formatting, code blocks, or backticks. Return raw JSON only.

CONFIDENCE SCORING GUIDELINES:
- 90-100: Extremely strong evidence across multiple interactions
- 70-89: Strong evidence from several data points
- 50-69: Moderate evidence, reasonably confident
- 30-49: Some indications but limited evidence
- 1-29: Speculative, based on minimal data

If there's very limited data available, be honest about the confidence scores and don't overstate certainty.";

const COMMUNICATION_ADVISOR: &str = "You are a communication strategist specializing in sales and customer engagement. Your task is to provide tailored communication recommendations based on a customer's persona.

YOUR TASK:
1. Recommend how to communicate effectively with this customer
2. Include guidance on channels, message structure and length, tone, frequency and timing, talking points that will resonate, topics to avoid, and building rapport
3. Tailor your advice to their specific traits, communication style, and decision factors

FORMAT YOUR RESPONSE:
- Use clear headings for different aspects of your recommendations
- Provide specific examples of language or approaches that would work well
- Include both dos and don'ts
- Keep your entire response under 400 words and focused on practical advice";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PersonaTrait {
    #[serde(rename = "trait")]
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "confidence_score")]
    pub confidence: u8,
}

/// Any JSON number, rounded and clamped into 1..=100.
fn confidence_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(1);
    }
    Ok(raw.round().clamp(1.0, 100.0) as u8)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub summary: String,
    pub communication_style: String,
    pub decision_factors: String,
    pub pain_points: Vec<String>,
    pub interests: Vec<String>,
    pub traits: Vec<PersonaTrait>,
}

impl StructuredFallback for Persona {
    fn fallback() -> Self {
        Persona {
            summary: "Unable to generate complete persona due to insufficient data or parsing error."
                .to_string(),
            communication_style:
                "Consider direct, clear communication until more interaction data is available."
                    .to_string(),
            decision_factors: "Unknown based on current data.".to_string(),
            pain_points: vec!["Insufficient data to determine specific pain points".to_string()],
            interests: vec!["Insufficient data to determine specific interests".to_string()],
            traits: vec![PersonaTrait {
                name: "Data Availability".to_string(),
                description: "Limited data available to create accurate persona".to_string(),
                confidence: 100,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaResult {
    pub contact_id: String,
    pub persona: Persona,
    pub profile_analysis: String,
    pub communication_advice: String,
}

impl SalesAssistant {
    /// Profile analysis, then a structured persona, then messaging advice.
    pub async fn build_persona(&self, contact_id: &str) -> Result<PersonaResult> {
        self.progress.send(AgentProgress::Started("Customer Persona Builder"));
        self.progress.send(AgentProgress::AssemblingContext);
        let context = ContactContext::assemble(self.store.as_ref(), contact_id).await?;
        let identity = compact(&context.identity());

        let full_context = compact(&json!({
            "contact": context.contact,
            "communications": context.communications,
            "deals": context.deals,
            "activities": context.activities,
        }));
        let profile_analysis = self
            .completer
            .complete(
                Specialist::ProfileAnalyzer,
                PROFILE_ANALYZER,
                &format!(
                    "Contact Context: {}\nAnalyze this contact's behavioral patterns based on the available data.",
                    full_context
                ),
            )
            .await;

        let raw_persona = self
            .completer
            .complete(
                Specialist::PersonaGenerator,
                PERSONA_GENERATOR,
                &format!(
                    "Contact Information: {}\nProfile Analysis: {}\nGenerate a detailed customer persona in JSON format.",
                    identity, profile_analysis
                ),
            )
            .await;
        let persona = parse_structured::<Persona>(&raw_persona);

        let persona_json = serde_json::to_string(&persona)?;
        let communication_advice = self
            .completer
            .complete(
                Specialist::CommunicationAdvisor,
                COMMUNICATION_ADVISOR,
                &format!(
                    "Contact Info: {}\nCustomer Persona: {}\nProvide tailored communication recommendations.",
                    identity, persona_json
                ),
            )
            .await;

        self.progress.send(AgentProgress::Completed);
        Ok(PersonaResult {
            contact_id: contact_id.to_string(),
            persona,
            profile_analysis,
            communication_advice,
        })
    }
}
