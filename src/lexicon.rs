//! Sentiment word lists
//!
//! The lexicons are matched by substring containment against cleaned, lowercased
//! text, so accented and unaccented spellings are both listed: customers often
//! type without diacritics.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

const POSITIVE_WORDS: &[&str] = &[
    "excelente", "ótimo", "otimo", "ótima", "otima", "bom", "boa", "maravilhoso",
    "maravilhosa", "perfeito", "perfeita", "satisfeito", "satisfeita", "adorei", "gostei",
    "amei", "recomendo", "parabéns", "parabens", "obrigado", "obrigada", "agradeço",
    "agradeco", "rápido", "rapido", "rápida", "rapida", "eficiente", "incrível", "incrivel",
    "fantástico", "fantastico", "agradável", "agradavel", "atencioso", "atenciosa",
    "educado", "educada", "prestativo", "prestativa", "pontual", "impecável", "impecavel",
    "sensacional", "espetacular", "resolvido", "resolveu", "feliz", "melhor", "qualidade",
    "confiável", "confiavel", "muito bom", "muito boa", "nota dez",
];

const NEGATIVE_WORDS: &[&str] = &[
    "péssimo", "pessimo", "péssima", "pessima", "ruim", "horrível", "horrivel", "terrível",
    "terrivel", "demora", "demorou", "demorado", "atraso", "atrasado", "atrasou", "lento",
    "lenta", "problema", "defeito", "quebrado", "quebrou", "reclamação", "reclamacao",
    "insatisfeito", "insatisfeita", "decepcionado", "decepcionada", "decepção", "decepcao",
    "não funcionou", "nao funcionou", "não funciona", "nao funciona", "não recebi",
    "nao recebi", "cancelar", "cancelamento", "reembolso", "absurdo", "descaso", "errado",
    "erro", "falha", "pior", "nunca mais", "mal atendido", "grosseiro", "grosseria", "raiva",
    "lamentável", "lamentavel", "enganado", "caro demais",
];

const NEUTRAL_WORDS: &[&str] = &[
    "informação", "informacao", "dúvida", "duvida", "pergunta", "pedido", "horário",
    "horario", "entrega", "preço", "preco", "valor", "produto", "serviço", "servico",
    "atendimento", "pagamento", "orçamento", "orcamento", "agendamento", "agendar",
    "endereço", "endereco", "contato", "consulta", "prazo", "disponível", "disponivel",
    "funcionamento", "quanto custa", "como funciona", "gostaria de saber",
];

/// Chat fillers and abbreviations missing from the general Portuguese list
const EXTRA_STOP_WORDS: &[&str] = &[
    "pra", "pro", "tá", "vc", "vcs", "você", "voce", "vocês", "voces", "então", "entao",
    "também", "tambem", "aqui", "ali", "olá", "ola", "oi", "obg", "blz", "tbm", "pq", "porque",
    "né", "aí", "hoje", "ontem", "amanhã", "amanha", "muito", "muita", "tudo", "nada", "sim",
    "não", "nao", "ainda", "já", "agora", "sempre",
];

/// Immutable word lists shared by every classifier instance
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
    neutral: Vec<String>,
    known: HashSet<String>,
    stop_words: HashSet<String>,
}

impl Lexicon {
    /// Build a lexicon from explicit lists; words are lowercased
    #[must_use]
    pub fn new<S: AsRef<str>>(
        positive: &[S],
        negative: &[S],
        neutral: &[S],
        stop_words: &[S],
    ) -> Self {
        let lower = |words: &[S]| -> Vec<String> {
            words.iter().map(|w| w.as_ref().trim().to_lowercase()).collect()
        };

        let positive = lower(positive);
        let negative = lower(negative);
        let neutral = lower(neutral);
        let known = positive
            .iter()
            .chain(&negative)
            .chain(&neutral)
            .cloned()
            .collect();
        let stop_words = lower(stop_words).into_iter().collect();

        Self {
            positive,
            negative,
            neutral,
            known,
            stop_words,
        }
    }

    /// The built-in Brazilian Portuguese customer-service lexicon
    #[must_use]
    pub fn portuguese() -> Self {
        let mut stop_words: Vec<String> = get(LANGUAGE::Portuguese)
            .iter()
            .map(ToString::to_string)
            .collect();
        stop_words.extend(EXTRA_STOP_WORDS.iter().map(ToString::to_string));

        Self::new(
            &POSITIVE_WORDS
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            &NEGATIVE_WORDS
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            &NEUTRAL_WORDS
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            &stop_words,
        )
    }

    /// Positive words
    #[must_use]
    pub fn positive(&self) -> &[String] {
        &self.positive
    }

    /// Negative words
    #[must_use]
    pub fn negative(&self) -> &[String] {
        &self.negative
    }

    /// Neutral (topic) words
    #[must_use]
    pub fn neutral(&self) -> &[String] {
        &self.neutral
    }

    /// True if the token is an entry of any of the three lists
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.known.contains(token)
    }

    /// True if the token is a stop word
    #[must_use]
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::portuguese()
    }
}
