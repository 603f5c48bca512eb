//! Prompt instructions derived from the previous turn's state

use std::fmt::Write;

use crate::models::{ConversationState, PendingAction, ResolvedAction, ResolvedIntent};

/// Extra system-prompt section describing the pending exchange.
///
/// Empty unless the previous assistant message was waiting on the user.
pub fn state_instruction(state: &ConversationState, resolved: Option<&ResolvedIntent>) -> String {
    if !state.awaiting_confirmation {
        return String::new();
    }

    let mut out = String::from("\n\n## CONTEXTO DA CONVERSA ANTERIOR\n");

    if let Some(question) = &state.last_question {
        let _ = writeln!(out, "Você perguntou: \"{}\"", question);
    }

    if let Some(intent) = resolved {
        match intent.action {
            ResolvedAction::Pending(action) if intent.confirmed == Some(true) => {
                let _ = writeln!(out, "O usuário CONFIRMOU que quer prosseguir com: {}", action);
                out.push_str(
                    "EXECUTE A AÇÃO AGORA. Não repita a pergunta. Não peça confirmação novamente.\n",
                );

                if action == PendingAction::CreateBudget {
                    out.push_str(
                        "\nCrie um orçamento sugerido baseado nos gastos atuais do usuário. \
                         Apresente valores por categoria.\n",
                    );
                }
            }
            ResolvedAction::Cancel => {
                out.push_str("O usuário CANCELOU a ação. Pergunte como mais você pode ajudar.\n");
            }
            ResolvedAction::Recommend => {
                out.push_str(
                    "O usuário quer sua RECOMENDAÇÃO. Dê conselhos práticos e específicos \
                     baseados nos dados financeiros.\n",
                );
            }
            ResolvedAction::Pending(_) => {}
        }
    }

    if let Some(value) = state.context.last_mentioned_value {
        let _ = writeln!(out, "Valor em discussão: R${:.2}", value);
    }

    if !state.context.last_mentioned_categories.is_empty() {
        let categories: Vec<&str> = state
            .context
            .last_mentioned_categories
            .iter()
            .map(String::as_str)
            .collect();
        let _ = writeln!(out, "Categorias em discussão: {}", categories.join(", "));
    }

    out
}
