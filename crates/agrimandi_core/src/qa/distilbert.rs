use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use std::ops::Range;
use std::path::Path;

use super::{QaAnswer, QaModel};

/// Longest answer span considered, in tokens.
const MAX_ANSWER_TOKENS: usize = 15;
/// Question tokens kept; the rest of the sequence goes to the context.
const MAX_QUESTION_TOKENS: usize = 64;
/// Tokens shared by consecutive context windows.
const DOC_STRIDE: usize = 128;

// ---------------------------------------------------------------------------
// Config (hardcoded for distilbert-base-cased-distilled-squad)
// ---------------------------------------------------------------------------

struct DistilBertConfig {
    dim: usize,
    hidden_dim: usize,
    n_heads: usize,
    head_dim: usize,
    n_layers: usize,
    vocab_size: usize,
    max_position_embeddings: usize,
    layer_norm_eps: f64,
}

impl DistilBertConfig {
    fn base_cased_squad() -> Self {
        Self {
            dim: 768,
            hidden_dim: 3072,
            n_heads: 12,
            head_dim: 64,
            n_layers: 6,
            vocab_size: 28996,
            max_position_embeddings: 512,
            layer_norm_eps: 1e-12,
        }
    }
}

// ---------------------------------------------------------------------------
// Layer norm (with bias)
// ---------------------------------------------------------------------------

struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    fn load(vb: VarBuilder, dim: usize, eps: f64) -> Result<Self> {
        let weight = vb.get(dim, "weight")?;
        let bias = vb.get(dim, "bias")?;
        Ok(Self { weight, bias, eps })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mean = x.mean_keepdim(candle_core::D::Minus1)?;
        let diff = x.broadcast_sub(&mean)?;
        let var = diff.sqr()?.mean_keepdim(candle_core::D::Minus1)?;
        let std = (var + self.eps)?.sqrt()?;
        let normed = diff.broadcast_div(&std)?;
        normed
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)
            .map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Self-attention (q_lin/k_lin/v_lin/out_lin) + post-norm
// ---------------------------------------------------------------------------

struct MultiHeadSelfAttention {
    q_lin: Linear,
    k_lin: Linear,
    v_lin: Linear,
    out_lin: Linear,
    n_heads: usize,
    head_dim: usize,
}

impl MultiHeadSelfAttention {
    fn load(vb: VarBuilder, config: &DistilBertConfig) -> Result<Self> {
        let d = config.dim;
        Ok(Self {
            q_lin: candle_nn::linear(d, d, vb.pp("q_lin"))?,
            k_lin: candle_nn::linear(d, d, vb.pp("k_lin"))?,
            v_lin: candle_nn::linear(d, d, vb.pp("v_lin"))?,
            out_lin: candle_nn::linear(d, d, vb.pp("out_lin"))?,
            n_heads: config.n_heads,
            head_dim: config.head_dim,
        })
    }

    fn split_heads(&self, x: Tensor, batch: usize, seq_len: usize) -> Result<Tensor> {
        x.reshape((batch, seq_len, self.n_heads, self.head_dim))?
            .transpose(1, 2)
            .map_err(Into::into)
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;

        let q = self.split_heads(self.q_lin.forward(x)?, batch, seq_len)?;
        let k = self.split_heads(self.k_lin.forward(x)?, batch, seq_len)?;
        let v = self.split_heads(self.v_lin.forward(x)?, batch, seq_len)?;

        let scale = (self.head_dim as f64).sqrt();
        let weights = q.matmul(&k.t()?)?.affine(1.0 / scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&weights, candle_core::D::Minus1)?;
        let context = weights.matmul(&v)?;

        let context = context.transpose(1, 2)?.contiguous()?.reshape((
            batch,
            seq_len,
            self.n_heads * self.head_dim,
        ))?;
        self.out_lin.forward(&context).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Transformer block: attention + FFN, each with residual and post-norm
// ---------------------------------------------------------------------------

struct TransformerBlock {
    attention: MultiHeadSelfAttention,
    sa_layer_norm: LayerNorm,
    lin1: Linear,
    lin2: Linear,
    output_layer_norm: LayerNorm,
}

impl TransformerBlock {
    fn load(vb: VarBuilder, config: &DistilBertConfig) -> Result<Self> {
        Ok(Self {
            attention: MultiHeadSelfAttention::load(vb.pp("attention"), config)?,
            sa_layer_norm: LayerNorm::load(vb.pp("sa_layer_norm"), config.dim, config.layer_norm_eps)?,
            lin1: candle_nn::linear(config.dim, config.hidden_dim, vb.pp("ffn").pp("lin1"))?,
            lin2: candle_nn::linear(config.hidden_dim, config.dim, vb.pp("ffn").pp("lin2"))?,
            output_layer_norm: LayerNorm::load(
                vb.pp("output_layer_norm"),
                config.dim,
                config.layer_norm_eps,
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let attn = self.attention.forward(x)?;
        let x = self.sa_layer_norm.forward(&(x + attn)?)?;

        let h = self.lin1.forward(&x)?.gelu_erf()?;
        let h = self.lin2.forward(&h)?;
        self.output_layer_norm.forward(&(x + h)?)
    }
}

// ---------------------------------------------------------------------------
// Full model with span-prediction head
// ---------------------------------------------------------------------------

struct DistilBertForQa {
    word_embeddings: Tensor,
    position_embeddings: Tensor,
    embedding_norm: LayerNorm,
    layers: Vec<TransformerBlock>,
    qa_outputs: Linear,
    config: DistilBertConfig,
}

impl DistilBertForQa {
    fn load(path: &Path, device: &Device) -> Result<Self> {
        let config = DistilBertConfig::base_cased_squad();

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };
        // Hub checkpoints nest the encoder under "distilbert."; bare exports don't.
        let encoder_vb = if vb.contains_tensor("distilbert.embeddings.word_embeddings.weight") {
            vb.pp("distilbert")
        } else {
            vb.clone()
        };

        let emb_vb = encoder_vb.pp("embeddings");
        let word_embeddings = emb_vb
            .pp("word_embeddings")
            .get((config.vocab_size, config.dim), "weight")?;
        let position_embeddings = emb_vb
            .pp("position_embeddings")
            .get((config.max_position_embeddings, config.dim), "weight")?;
        let embedding_norm =
            LayerNorm::load(emb_vb.pp("LayerNorm"), config.dim, config.layer_norm_eps)?;

        let mut layers = Vec::with_capacity(config.n_layers);
        for i in 0..config.n_layers {
            layers.push(TransformerBlock::load(
                encoder_vb.pp("transformer").pp("layer").pp(i.to_string()),
                &config,
            )?);
        }

        let qa_outputs = candle_nn::linear(config.dim, 2, vb.pp("qa_outputs"))?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            embedding_norm,
            layers,
            qa_outputs,
            config,
        })
    }

    /// Start and end logits for every token.
    fn forward(&self, token_ids: &[u32]) -> Result<(Vec<f32>, Vec<f32>)> {
        let device = self.word_embeddings.device();
        let seq_len = token_ids.len();

        if seq_len > self.config.max_position_embeddings {
            bail!(
                "input length {seq_len} exceeds max {}",
                self.config.max_position_embeddings
            );
        }

        let ids = Tensor::new(token_ids, device)?;
        let word_emb = self.word_embeddings.index_select(&ids, 0)?;

        let position_ids: Vec<u32> = (0..seq_len as u32).collect();
        let position_ids = Tensor::new(position_ids.as_slice(), device)?;
        let pos_emb = self.position_embeddings.index_select(&position_ids, 0)?;

        let mut hidden = self.embedding_norm.forward(&(word_emb + pos_emb)?)?;
        hidden = hidden.unsqueeze(0)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        let logits = self.qa_outputs.forward(&hidden)?.squeeze(0)?;
        let start = logits.narrow(1, 0, 1)?.squeeze(1)?.to_vec1::<f32>()?;
        let end = logits.narrow(1, 1, 1)?.squeeze(1)?.to_vec1::<f32>()?;
        Ok((start, end))
    }
}

/// Softmax over the positions where `mask` is set; other positions get 0.
fn masked_softmax(logits: &[f32], mask: &[bool]) -> Vec<f32> {
    let max = logits
        .iter()
        .zip(mask)
        .filter(|(_, m)| **m)
        .map(|(l, _)| *l)
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return vec![0.0; logits.len()];
    }

    let exps: Vec<f32> = logits
        .iter()
        .zip(mask)
        .map(|(l, m)| if *m { (l - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Most probable answer span `(start, end, p_start * p_end)` with both ends
/// inside the context and `end - start < max_len`.
fn best_span(
    start_logits: &[f32],
    end_logits: &[f32],
    context_mask: &[bool],
    max_len: usize,
) -> Option<(usize, usize, f32)> {
    let p_start = masked_softmax(start_logits, context_mask);
    let p_end = masked_softmax(end_logits, context_mask);

    let mut best: Option<(usize, usize, f32)> = None;
    for s in (0..context_mask.len()).filter(|&i| context_mask[i]) {
        let last = (s + max_len).min(context_mask.len());
        for e in (s..last).filter(|&i| context_mask[i]) {
            let score = p_start[s] * p_end[e];
            if best.map_or(true, |(_, _, b)| score > b) {
                best = Some((s, e, score));
            }
        }
    }
    best
}

/// Context token ranges of at most `window` tokens covering `n_tokens`,
/// each overlapping the previous one by `stride` tokens.
fn context_windows(n_tokens: usize, window: usize, stride: usize) -> Vec<Range<usize>> {
    if n_tokens == 0 || window == 0 {
        return Vec::new();
    }
    let step = window.saturating_sub(stride).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(n_tokens);
        windows.push(start..end);
        if end == n_tokens {
            break;
        }
        start += step;
    }
    windows
}

/// `[CLS] question [SEP] context [SEP]` plus a mask selecting the context.
fn window_input(cls: u32, sep: u32, question: &[u32], context: &[u32]) -> (Vec<u32>, Vec<bool>) {
    let mut ids = Vec::with_capacity(question.len() + context.len() + 3);
    ids.push(cls);
    ids.extend_from_slice(question);
    ids.push(sep);
    ids.extend_from_slice(context);
    ids.push(sep);

    let first = question.len() + 2;
    let mask = (0..ids.len())
        .map(|i| i >= first && i < first + context.len())
        .collect();
    (ids, mask)
}

// ---------------------------------------------------------------------------
// Public DistilBertQaModel
// ---------------------------------------------------------------------------

pub struct DistilBertQaModel {
    model: DistilBertForQa,
    tokenizer: tokenizers::Tokenizer,
    cls_id: u32,
    sep_id: u32,
}

impl DistilBertQaModel {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let device = Device::Cpu;
        let model = DistilBertForQa::load(model_path, &device)?;

        let mut tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("load tokenizer: {e}"))?;
        // Windows are assembled by hand, so the tokenizer must not cut or pad.
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("configure tokenizer: {e}"))?;
        tokenizer.with_padding(None);

        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| anyhow!("tokenizer has no {token} token"))
        };
        let cls_id = special("[CLS]")?;
        let sep_id = special("[SEP]")?;

        Ok(Self {
            model,
            tokenizer,
            cls_id,
            sep_id,
        })
    }
}

impl QaModel for DistilBertQaModel {
    fn answer(&self, question: &str, context: &str) -> Result<QaAnswer> {
        let question = self
            .tokenizer
            .encode(question, false)
            .map_err(|e| anyhow!("tokenize question: {e}"))?;
        let context_enc = self
            .tokenizer
            .encode(context, false)
            .map_err(|e| anyhow!("tokenize context: {e}"))?;

        let question_ids = question.get_ids();
        let question_ids = &question_ids[..question_ids.len().min(MAX_QUESTION_TOKENS)];
        let context_ids = context_enc.get_ids();
        let window = self.model.config.max_position_embeddings - question_ids.len() - 3;
        let first = question_ids.len() + 2;

        // Best span over all windows, as context token indices.
        let mut best: Option<(usize, usize, f32)> = None;
        for range in context_windows(context_ids.len(), window, DOC_STRIDE) {
            let (ids, mask) = window_input(
                self.cls_id,
                self.sep_id,
                question_ids,
                &context_ids[range.clone()],
            );
            let (start_logits, end_logits) = self.model.forward(&ids)?;

            let Some((s, e, score)) =
                best_span(&start_logits, &end_logits, &mask, MAX_ANSWER_TOKENS)
            else {
                continue;
            };
            if best.map_or(true, |(_, _, b)| score > b) {
                best = Some((s - first + range.start, e - first + range.start, score));
            }
        }

        let Some((s, e, confidence)) = best else {
            return Ok(QaAnswer {
                answer: String::new(),
                confidence: 0.0,
            });
        };

        let offsets = context_enc.get_offsets();
        let (begin, _) = offsets[s];
        let (_, finish) = offsets[e];
        let answer = context.get(begin..finish).unwrap_or_default().trim().to_string();

        Ok(QaAnswer { answer, confidence })
    }
}
