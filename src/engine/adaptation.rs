//! プロンプト調整
//!
//! ステップの基本指示にリスクプロファイル（とトーン）に応じた前置きを付け、
//! サンプリング温度を決定します。入力だけから結果が決まる純粋関数です。
//!
//! | Risk   | Temperature |
//! |--------|-------------|
//! | High   | 0.8         |
//! | Medium | 0.7         |
//! | Low    | 0.5         |

use crate::config::settings::{PromptProfile, RiskProfile};
use crate::config::step::InputType;

const LOW_RISK_GUIDANCE: &str = "Take a conservative approach. Flag every potential legal risk, \
    cite the governing rule where possible, and recommend the most protective option.";

const MEDIUM_RISK_GUIDANCE: &str = "Take a balanced approach. Identify material legal risks \
    and weigh them against practical business considerations.";

const HIGH_RISK_GUIDANCE: &str = "Take a pragmatic, commercially minded approach. Focus on \
    the most significant risks and favour workable solutions over exhaustive caveats.";

const BUILD_ON_PREVIOUS: &str = "Build on the results of the previous steps provided below. \
    Stay consistent with earlier conclusions and call out anything that should be revisited.";

/// 調整後のプロンプトとサンプリング温度
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedPrompt {
    pub prompt: String,
    pub temperature: f32,
}

/// リスクプロファイルに対応するサンプリング温度
pub fn temperature_for(risk: RiskProfile) -> f32 {
    match risk {
        RiskProfile::High => 0.8,
        RiskProfile::Medium => 0.7,
        RiskProfile::Low => 0.5,
    }
}

fn guidance_for(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Low => LOW_RISK_GUIDANCE,
        RiskProfile::Medium => MEDIUM_RISK_GUIDANCE,
        RiskProfile::High => HIGH_RISK_GUIDANCE,
    }
}

/// 基本指示を調整する
///
/// # 例
///
/// ```rust
/// use legal_workflow::config::{InputType, PromptProfile, RiskProfile};
/// use legal_workflow::engine::adaptation::adapt;
///
/// let adapted = adapt("Summarize the lease.", &PromptProfile::new(RiskProfile::Low), InputType::Text);
/// assert!(adapted.prompt.ends_with("Summarize the lease."));
/// assert_eq!(adapted.temperature, 0.5);
/// ```
pub fn adapt(base_instruction: &str, profile: &PromptProfile, input_type: InputType) -> AdaptedPrompt {
    let mut sections = vec![guidance_for(profile.risk_profile).to_string()];

    if let Some(tone) = profile.tone.as_deref().map(str::trim)
        && !tone.is_empty()
    {
        sections.push(format!("Write in a {} tone.", tone));
    }

    sections.push(base_instruction.to_string());

    if input_type == InputType::PreviousOutput {
        sections.push(BUILD_ON_PREVIOUS.to_string());
    }

    AdaptedPrompt {
        prompt: sections.join("\n\n"),
        temperature: temperature_for(profile.risk_profile),
    }
}
